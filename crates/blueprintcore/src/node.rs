use crate::{catalog, DataType, GraphError, Pin, PinId, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable handle of a node, allocated from the graph's monotonic counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in a blueprint graph
///
/// Pins are never stored; they are derived from `kind` through the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord", into = "NodeRecord")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: Option<String>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self { id, kind, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn pins(&self) -> Vec<Pin> {
        catalog::pins(self.id, &self.kind)
    }

    pub fn pin(&self, id: &PinId) -> Option<Pin> {
        self.pins().into_iter().find(|pin| &pin.id == id)
    }

    /// Display name: the author's label, or the kind name
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.kind.tag().as_str().to_string())
    }
}

/// The closed set of node kinds, each with its own configuration
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Begin,
    ActionInvocation(ActionConfig),
    ValueLiteral(LiteralConfig),
    TypeConverter(ConverterConfig),
}

impl NodeKind {
    pub fn literal(data_type: DataType, value: impl Into<Value>) -> Self {
        NodeKind::ValueLiteral(LiteralConfig {
            data_type,
            value: value.into(),
        })
    }

    pub fn converter(from: DataType, to: DataType) -> Self {
        NodeKind::TypeConverter(ConverterConfig { from, to })
    }

    pub fn action(config: ActionConfig) -> Self {
        NodeKind::ActionInvocation(config)
    }

    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Begin => NodeKindTag::Begin,
            NodeKind::ActionInvocation(_) => NodeKindTag::ActionInvocation,
            NodeKind::ValueLiteral(_) => NodeKindTag::ValueLiteral,
            NodeKind::TypeConverter(_) => NodeKindTag::TypeConverter,
        }
    }

    /// Literals and converters can be evaluated on demand by a consumer
    pub fn is_pullable(&self) -> bool {
        matches!(self, NodeKind::ValueLiteral(_) | NodeKind::TypeConverter(_))
    }

    /// Reject a configuration whose pins would share an id on node `id`,
    /// such as two parameters with the same name
    pub fn check_pins(&self, id: NodeId) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for pin in catalog::pins(id, self) {
            if !seen.insert(pin.id.clone()) {
                return Err(GraphError::InvalidNodeConfig {
                    node: id,
                    message: format!("pin {} is declared more than once", pin.id),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindTag {
    Begin,
    ActionInvocation,
    ValueLiteral,
    TypeConverter,
}

impl NodeKindTag {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKindTag::Begin => "begin",
            NodeKindTag::ActionInvocation => "action_invocation",
            NodeKindTag::ValueLiteral => "value_literal",
            NodeKindTag::TypeConverter => "type_converter",
        }
    }
}

/// Binding of an action-invocation node to an external action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub component_id: String,
    pub action_id: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default = "default_result_type")]
    pub result_type: DataType,
    /// Expose Success/Error branch pins instead of aborting on failure
    #[serde(default)]
    pub routes_errors: bool,
    #[serde(default)]
    pub outputs: Vec<ResultField>,
}

fn default_result_type() -> DataType {
    DataType::Object
}

impl ActionConfig {
    pub fn new(component_id: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            action_id: action_id.into(),
            parameters: Vec::new(),
            result_type: default_result_type(),
            routes_errors: false,
            outputs: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.parameters.push(ParameterSpec::new(name, data_type));
        self
    }

    pub fn with_result_type(mut self, data_type: DataType) -> Self {
        self.result_type = data_type;
        self
    }

    pub fn with_output(mut self, path: impl Into<String>, data_type: DataType) -> Self {
        self.outputs.push(ResultField {
            path: path.into(),
            data_type,
            label: None,
        });
        self
    }

    pub fn routing_errors(mut self) -> Self {
        self.routes_errors = true;
        self
    }
}

/// A declared parameter of the bound action; becomes one data-in pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the parameter as one the action cannot run without
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Projection of the action result data onto an extra data-out pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultField {
    /// Dot path into the result data
    pub path: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralConfig {
    pub data_type: DataType,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub from: DataType,
    pub to: DataType,
}

/// Interchange form of a node: `{id, kind, config, label?, pins}`
///
/// `pins` is written for consumers of exported graphs and ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKindTag,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_deserializing)]
    pub pins: Vec<Pin>,
}

impl TryFrom<NodeRecord> for Node {
    type Error = GraphError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let invalid = move |e: serde_json::Error| GraphError::InvalidNodeConfig {
            node: id,
            message: e.to_string(),
        };
        let config = record.config;
        let kind = match record.kind {
            NodeKindTag::Begin => NodeKind::Begin,
            NodeKindTag::ActionInvocation => {
                NodeKind::ActionInvocation(serde_json::from_value(config).map_err(invalid)?)
            }
            NodeKindTag::ValueLiteral => {
                NodeKind::ValueLiteral(serde_json::from_value(config).map_err(invalid)?)
            }
            NodeKindTag::TypeConverter => {
                NodeKind::TypeConverter(serde_json::from_value(config).map_err(invalid)?)
            }
        };
        kind.check_pins(id)?;
        Ok(Node {
            id,
            kind,
            label: record.label,
        })
    }
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        let pins = node.pins();
        let config = match &node.kind {
            NodeKind::Begin => serde_json::Value::Null,
            NodeKind::ActionInvocation(c) => serde_json::to_value(c).unwrap_or_default(),
            NodeKind::ValueLiteral(c) => serde_json::to_value(c).unwrap_or_default(),
            NodeKind::TypeConverter(c) => serde_json::to_value(c).unwrap_or_default(),
        };
        NodeRecord {
            id: node.id,
            kind: node.kind.tag(),
            config,
            label: node.label,
            pins,
        }
    }
}
