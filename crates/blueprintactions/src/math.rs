use crate::registry::{describe, number, ActionHandler};
use async_trait::async_trait;
use blueprintcore::{ActionDescriptor, ActionError, DataType, ParameterSpec, Parameters, Value};

/// `a + b`
pub struct Sum;

#[async_trait]
impl ActionHandler for Sum {
    fn descriptor(&self) -> ActionDescriptor {
        let mut descriptor = describe("math", "sum", "Adds two numbers", DataType::Number);
        descriptor.parameters = vec![
            ParameterSpec::new("a", DataType::Number),
            ParameterSpec::new("b", DataType::Number),
        ];
        descriptor
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        Ok(Value::Number(number(&parameters, "a")? + number(&parameters, "b")?))
    }
}

/// `dividend / divisor`; fails on a zero divisor
pub struct Divide;

#[async_trait]
impl ActionHandler for Divide {
    fn descriptor(&self) -> ActionDescriptor {
        let mut descriptor = describe("math", "divide", "Divides two numbers", DataType::Number);
        descriptor.parameters = vec![
            ParameterSpec::new("dividend", DataType::Number),
            ParameterSpec::new("divisor", DataType::Number).with_default(1.0),
        ];
        descriptor.can_fail = true;
        descriptor
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        let divisor = number(&parameters, "divisor")?;
        if divisor == 0.0 {
            return Err(ActionError::Failed("division by zero".to_string()));
        }
        Ok(Value::Number(number(&parameters, "dividend")? / divisor))
    }
}
