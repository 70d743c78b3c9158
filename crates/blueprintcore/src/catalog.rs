//! Pin shapes of the node kinds
//!
//! Pins are a pure function of a node's id, kind and configuration. Nothing
//! else in the engine stores them, so reconfiguring a node changes its pins
//! in exactly one place.

use crate::{NodeId, NodeKind, Pin, PinKind, PinRole};

/// Derive the pins of a node in display order: execution inputs, execution
/// outputs, data inputs, data outputs.
pub fn pins(node: NodeId, kind: &NodeKind) -> Vec<Pin> {
    match kind {
        NodeKind::Begin => vec![Pin::execution_out(node, PinRole::Next, "Next")],

        NodeKind::ActionInvocation(config) => {
            let mut pins = vec![Pin::execution_in(node)];

            if config.routes_errors {
                pins.push(Pin::execution_out(node, PinRole::Success, "Success"));
                pins.push(Pin::execution_out(node, PinRole::Error, "Error"));
            } else {
                // one continuation, taken when the action succeeds
                pins.push(Pin::execution_out(node, PinRole::Next, "Success"));
            }

            for param in &config.parameters {
                pins.push(Pin::data_in(
                    node,
                    PinRole::Parameter(param.name.clone()),
                    param.data_type,
                    &param.name,
                ));
            }

            pins.push(Pin::data_out(node, PinRole::Result, config.result_type, "Result"));

            for field in &config.outputs {
                let label = field.label.as_deref().unwrap_or(&field.path);
                pins.push(Pin::data_out(
                    node,
                    PinRole::Field(field.path.clone()),
                    field.data_type,
                    label,
                ));
            }

            pins
        }

        NodeKind::ValueLiteral(config) => {
            vec![Pin::data_out(node, PinRole::Output, config.data_type, "Value")]
        }

        NodeKind::TypeConverter(config) => vec![
            Pin::data_in(node, PinRole::Input, config.from, config.from.as_str()),
            Pin::data_out(node, PinRole::Output, config.to, config.to.as_str()),
        ],
    }
}

/// Whether the node exposes labeled Success/Error branch pins
pub fn has_branch_pins(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::ActionInvocation(config) if config.routes_errors)
}

/// Whether the node can be reached by the control-flow walk
pub fn has_execution_input(kind: &NodeKind) -> bool {
    pins(NodeId(0), kind)
        .iter()
        .any(|pin| pin.pin_kind == PinKind::ExecutionIn)
}
