use crate::registry::{describe, number, ActionHandler};
use async_trait::async_trait;
use blueprintcore::{ActionDescriptor, ActionError, DataType, ParameterSpec, Parameters, Value};
use tokio::time::{sleep, Duration};
use tracing::info;

/// Sleep for `delay_ms` milliseconds
pub struct Delay;

#[async_trait]
impl ActionHandler for Delay {
    fn descriptor(&self) -> ActionDescriptor {
        let mut descriptor = describe(
            "time",
            "delay",
            "Delays execution for the given milliseconds",
            DataType::Number,
        );
        descriptor.parameters =
            vec![ParameterSpec::new("delay_ms", DataType::Number).with_default(1000.0)];
        descriptor
    }

    async fn call(&self, parameters: Parameters) -> Result<Value, ActionError> {
        let delay_ms = number(&parameters, "delay_ms")?.max(0.0) as u64;
        info!("Delaying for {}ms", delay_ms);
        sleep(Duration::from_millis(delay_ms)).await;
        Ok(Value::Number(delay_ms as f64))
    }
}
