//! Graph execution runtime
//!
//! Walks execution edges from a start node, resolves data inputs by pulling
//! literals and converters on demand, and reports progress to observers and
//! the event bus.

mod context;
mod effects;
mod executor;
mod observer;
mod resolve;
mod runtime;

pub use context::{ExecutionContext, SoftFailureReason, SoftResolutionFailure};
pub use executor::{select_start, Engine, RunOptions, RunReport};
pub use observer::{Callbacks, EventBusObserver, NoopObserver, ObserverSet, RunObserver};
pub use runtime::{FlowRuntime, RuntimeConfig};
