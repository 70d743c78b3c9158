use async_trait::async_trait;
use blueprintcore::{
    ActionAdapter, ActionDescriptor, ActionError, ActionResult, DataType, ParameterSpec,
    Parameters, Value,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A single action the registry can dispatch to
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Identity, parameters and result type of the action
    fn descriptor(&self) -> ActionDescriptor;

    /// Run the action; `Ok` becomes the result data
    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError>;
}

/// Action adapter backed by an in-process table of handlers
pub struct ActionRegistry {
    handlers: HashMap<(String, String), Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any handler with the same ids
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        let descriptor = handler.descriptor();
        info!(
            "Registering action: {}.{}",
            descriptor.component_id, descriptor.action_id
        );
        self.handlers
            .insert((descriptor.component_id, descriptor.action_id), handler);
    }

    pub fn get(&self, component_id: &str, action_id: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers
            .get(&(component_id.to_string(), action_id.to_string()))
    }

    pub fn descriptor(&self, component_id: &str, action_id: &str) -> Option<ActionDescriptor> {
        self.get(component_id, action_id).map(|h| h.descriptor())
    }

    /// Every registered action, ordered by component then action
    pub fn descriptors(&self) -> Vec<ActionDescriptor> {
        let mut all: Vec<_> = self.handlers.values().map(|h| h.descriptor()).collect();
        all.sort_by(|a, b| {
            (&a.component_id, &a.action_id).cmp(&(&b.component_id, &b.action_id))
        });
        all
    }

    /// `component.action` names of every registered action
    pub fn list(&self) -> Vec<String> {
        self.descriptors()
            .into_iter()
            .map(|d| format!("{}.{}", d.component_id, d.action_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionAdapter for ActionRegistry {
    async fn invoke(
        &self,
        component_id: &str,
        action_id: &str,
        parameters: Parameters,
    ) -> Result<ActionResult, ActionError> {
        let handler = self
            .get(component_id, action_id)
            .ok_or_else(|| ActionError::UnknownAction {
                component: component_id.to_string(),
                action: action_id.to_string(),
            })?;

        check_required(&handler.descriptor().parameters, &parameters)?;
        debug!(component = component_id, action = action_id, "Dispatching action");

        match handler.call(parameters).await {
            Ok(data) => Ok(ActionResult::ok(data)),
            Err(e) => {
                warn!(component = component_id, action = action_id, "Action failed: {}", e);
                Ok(ActionResult::failure(e.to_string()))
            }
        }
    }
}

/// Reject a direct call that omits a required parameter
///
/// The engine fills every parameter before calling, so on engine calls this
/// only catches an explicit null. Unresolved required inputs show up as soft
/// failures of the run instead.
fn check_required(specs: &[ParameterSpec], parameters: &Parameters) -> Result<(), ActionError> {
    for spec in specs.iter().filter(|s| s.required) {
        if parameters.get(&spec.name).map_or(true, Value::is_null) {
            return Err(ActionError::InvalidParameter {
                name: spec.name.clone(),
                message: "required parameter is missing".to_string(),
            });
        }
    }
    Ok(())
}

type BoxedCall = Box<dyn Fn(Parameters) -> BoxFuture<'static, Result<Value, ActionError>> + Send + Sync>;

/// Handler built from a descriptor and an async closure
pub struct FnAction {
    descriptor: ActionDescriptor,
    call: BoxedCall,
}

impl FnAction {
    pub fn new<F, Fut>(descriptor: ActionDescriptor, f: F) -> Self
    where
        F: Fn(Parameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        Self {
            descriptor,
            call: Box::new(move |parameters| f(parameters).boxed()),
        }
    }
}

#[async_trait]
impl ActionHandler for FnAction {
    fn descriptor(&self) -> ActionDescriptor {
        self.descriptor.clone()
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        (self.call)(parameters).await
    }
}

/// Start a descriptor for `component.action`
pub fn describe(
    component_id: &str,
    action_id: &str,
    description: &str,
    result_type: DataType,
) -> ActionDescriptor {
    ActionDescriptor {
        component_id: component_id.to_string(),
        action_id: action_id.to_string(),
        description: description.to_string(),
        parameters: Vec::new(),
        result_type,
        can_fail: false,
    }
}

/// Numeric parameter, which the engine has already coerced
pub(crate) fn number(parameters: &Parameters, name: &str) -> Result<f64, ActionError> {
    parameters
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| ActionError::InvalidParameter {
            name: name.to_string(),
            message: "expected a number".to_string(),
        })
}

pub(crate) fn text<'a>(parameters: &'a Parameters, name: &str) -> Result<&'a str, ActionError> {
    parameters
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ActionError::InvalidParameter {
            name: name.to_string(),
            message: "expected a string".to_string(),
        })
}
