use crate::registry::{describe, text, ActionHandler};
use async_trait::async_trait;
use blueprintcore::{ActionDescriptor, ActionError, DataType, ParameterSpec, Parameters, Value};

/// Join two strings with an optional separator
pub struct TextConcat;

#[async_trait]
impl ActionHandler for TextConcat {
    fn descriptor(&self) -> ActionDescriptor {
        let mut descriptor = describe("text", "concat", "Concatenates two strings", DataType::String);
        descriptor.parameters = vec![
            ParameterSpec::new("left", DataType::String),
            ParameterSpec::new("right", DataType::String),
            ParameterSpec::new("separator", DataType::String).with_default(""),
        ];
        descriptor
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        let left = text(&parameters, "left")?;
        let right = text(&parameters, "right")?;
        let separator = parameters
            .get("separator")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(Value::String(format!("{}{}{}", left, separator, right)))
    }
}

/// Parse JSON text into a structured value
pub struct JsonParse;

#[async_trait]
impl ActionHandler for JsonParse {
    fn descriptor(&self) -> ActionDescriptor {
        let mut descriptor = describe("json", "parse", "Parses JSON text", DataType::Object);
        descriptor.parameters = vec![ParameterSpec::new("text", DataType::String).required()];
        descriptor.can_fail = true;
        descriptor
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        let input = text(&parameters, "text")?;
        serde_json::from_str::<Value>(input)
            .map_err(|e| ActionError::Failed(format!("JSON parse error: {}", e)))
    }
}
