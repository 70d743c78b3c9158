//! Kind-specific node effects that do not touch the action adapter

use crate::context::ExecutionContext;
use blueprintcore::coerce::coerce;
use blueprintcore::{
    ActionConfig, ActionResult, ConverterConfig, LiteralConfig, NodeError, NodeId, NodeOutcome,
    Parameters, PinId, PinRole, Value,
};

/// Values a node publishes onto its data-out pins
pub(crate) type Publications = Vec<(PinId, Value)>;

pub(crate) fn literal(node: NodeId, config: &LiteralConfig) -> Result<Publications, NodeError> {
    if config.value.data_type() != Some(config.data_type) {
        return Err(NodeError::InvalidLiteral {
            expected: config.data_type,
            actual: config.value.to_json_string(),
        });
    }
    Ok(vec![(
        PinId::new(node, &PinRole::Output),
        config.value.clone(),
    )])
}

pub(crate) fn convert(
    node: NodeId,
    config: &ConverterConfig,
    context: &ExecutionContext,
) -> Publications {
    let input = context
        .variable(&PinId::new(node, &PinRole::Input))
        .cloned()
        .unwrap_or_else(|| config.from.default_value());
    vec![(PinId::new(node, &PinRole::Output), coerce(&input, config.to))]
}

/// Outcome recorded for a literal or converter
pub(crate) fn published_outcome(publications: &Publications) -> NodeOutcome {
    let value = publications
        .first()
        .map(|(_, value)| value.clone())
        .unwrap_or_default();
    NodeOutcome::Published { value }
}

/// Parameter map built from the node's resolved data-in pins
pub(crate) fn parameters(
    node: NodeId,
    config: &ActionConfig,
    context: &ExecutionContext,
) -> Parameters {
    config
        .parameters
        .iter()
        .map(|param| {
            let pin = PinId::new(node, &PinRole::Parameter(param.name.clone()));
            let value = context
                .variable(&pin)
                .cloned()
                .unwrap_or_else(|| param.data_type.default_value());
            (param.name.clone(), value)
        })
        .collect()
}

/// Project an action result onto the node's data-out pins
///
/// A failed result without data publishes nothing, leaving consumers to fall
/// back to defaults.
pub(crate) fn project_result(
    node: NodeId,
    config: &ActionConfig,
    result: &ActionResult,
) -> Publications {
    let data = match (&result.data, result.success) {
        (Some(data), _) => data.clone(),
        (None, true) => Value::Null,
        (None, false) => return Vec::new(),
    };

    let mut out = vec![(
        PinId::new(node, &PinRole::Result),
        coerce(&data, config.result_type),
    )];
    for field in &config.outputs {
        let value = data
            .pointer(&field.path)
            .map(|v| coerce(v, field.data_type))
            .unwrap_or_else(|| field.data_type.default_value());
        out.push((PinId::new(node, &PinRole::Field(field.path.clone())), value));
    }
    out
}
