use crate::registry::{describe, ActionHandler};
use async_trait::async_trait;
use blueprintcore::{ActionDescriptor, ActionError, DataType, ParameterSpec, Parameters, Value};
use tracing::info;

/// Logs its message and passes it through
pub struct DebugLog;

#[async_trait]
impl ActionHandler for DebugLog {
    fn descriptor(&self) -> ActionDescriptor {
        let mut descriptor = describe("debug", "log", "Logs a message", DataType::String);
        descriptor.parameters = vec![ParameterSpec::new("message", DataType::String)
            .with_default("(no message)")];
        descriptor
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        let message = parameters
            .get("message")
            .map(Value::to_string)
            .unwrap_or_default();

        info!("DEBUG: {}", message);
        for (key, value) in parameters.iter().filter(|(k, _)| k.as_str() != "message") {
            info!("  {}: {}", key, value);
        }

        Ok(Value::String(message))
    }
}
