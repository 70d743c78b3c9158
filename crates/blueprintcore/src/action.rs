use crate::{ActionConfig, ActionError, DataType, ParameterSpec, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters handed to an action, keyed by parameter name
pub type Parameters = BTreeMap<String, Value>;

/// Executes named actions on behalf of action-invocation nodes
///
/// The engine is handed an adapter when it is built; it never looks one up.
#[async_trait]
pub trait ActionAdapter: Send + Sync {
    /// Invoke `action_id` on `component_id`.
    ///
    /// An `Err` is treated by the engine exactly like `ActionResult { success: false }`.
    async fn invoke(
        &self,
        component_id: &str,
        action_id: &str,
        parameters: Parameters,
    ) -> Result<ActionResult, ActionError>;
}

/// Structured outcome of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl From<ActionError> for ActionResult {
    fn from(error: ActionError) -> Self {
        ActionResult::failure(error.to_string())
    }
}

/// Description of an action an adapter can run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub component_id: String,
    pub action_id: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub result_type: DataType,
    /// The action can fail in a way a graph should route around
    pub can_fail: bool,
}

impl ActionConfig {
    /// Node config bound to a described action
    pub fn from_descriptor(descriptor: &ActionDescriptor) -> Self {
        Self {
            component_id: descriptor.component_id.clone(),
            action_id: descriptor.action_id.clone(),
            parameters: descriptor.parameters.clone(),
            result_type: descriptor.result_type,
            routes_errors: descriptor.can_fail,
            outputs: Vec::new(),
        }
    }
}

/// What running a node produced, recorded per node in the execution context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Entry point passed
    Began,
    /// Value published by a literal or converter
    Published { value: Value },
    /// Result returned by the action adapter
    Invoked(ActionResult),
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            NodeOutcome::Began | NodeOutcome::Published { .. } => true,
            NodeOutcome::Invoked(result) => result.success,
        }
    }
}
