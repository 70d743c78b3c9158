//! Built-in actions
//!
//! An [`ActionRegistry`] dispatches `(component, action)` pairs to handlers
//! and serves as the engine's action adapter.

mod debug;
mod math;
mod registry;
mod time;
mod transform;

pub use debug::DebugLog;
pub use math::{Divide, Sum};
pub use registry::{describe, ActionHandler, ActionRegistry, FnAction};
pub use time::Delay;
pub use transform::{JsonParse, TextConcat};

use std::sync::Arc;

/// Register all built-in actions with a registry
pub fn register_all(registry: &mut ActionRegistry) {
    registry.register(Arc::new(DebugLog));
    registry.register(Arc::new(Sum));
    registry.register(Arc::new(Divide));
    registry.register(Arc::new(TextConcat));
    registry.register(Arc::new(JsonParse));
    registry.register(Arc::new(Delay));
}

/// A registry holding every built-in action
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    register_all(&mut registry);
    registry
}
