use crate::{DataType, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a pin, unique within its node
///
/// Formed from the owning node id and the pin's slot, e.g. `7/in:a`. The id
/// carries no revision: reconfiguring a node keeps the ids of the slots it
/// still has, whatever their new data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(String);

impl PinId {
    pub fn new(node: NodeId, role: &PinRole) -> Self {
        Self(format!("{}/{}", node, role.slot()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinKind {
    ExecutionIn,
    ExecutionOut,
    DataIn,
    DataOut,
}

/// Pins only connect within the same family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinFamily {
    Execution,
    Data,
}

impl PinKind {
    pub fn family(self) -> PinFamily {
        match self {
            PinKind::ExecutionIn | PinKind::ExecutionOut => PinFamily::Execution,
            PinKind::DataIn | PinKind::DataOut => PinFamily::Data,
        }
    }

    pub fn is_input(self) -> bool {
        matches!(self, PinKind::ExecutionIn | PinKind::DataIn)
    }

    pub fn is_output(self) -> bool {
        !self.is_input()
    }
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinKind::ExecutionIn => "execution-in",
            PinKind::ExecutionOut => "execution-out",
            PinKind::DataIn => "data-in",
            PinKind::DataOut => "data-out",
        };
        f.write_str(name)
    }
}

/// What a pin is for within its node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "slot", content = "name", rename_all = "snake_case")]
pub enum PinRole {
    ExecIn,
    Next,
    Success,
    Error,
    /// Data input bound to the named action parameter
    Parameter(String),
    /// Whole action result
    Result,
    /// Projection of the action result at a dot path
    Field(String),
    Input,
    Output,
}

impl PinRole {
    /// Stable slot name used to build the pin id
    pub fn slot(&self) -> String {
        match self {
            PinRole::ExecIn => "exec-in".to_string(),
            PinRole::Next => "exec-out".to_string(),
            PinRole::Success => "exec-success".to_string(),
            PinRole::Error => "exec-error".to_string(),
            PinRole::Parameter(name) => format!("in:{}", name),
            PinRole::Result | PinRole::Output => "out".to_string(),
            PinRole::Field(path) => format!("out:{}", path),
            PinRole::Input => "in".to_string(),
        }
    }

    /// Branch pins route control by outcome
    pub fn is_branch(&self) -> bool {
        matches!(self, PinRole::Success | PinRole::Error)
    }
}

/// A connection point on a node, derived from the node's kind and config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    pub pin_kind: PinKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    pub label: String,
    pub accepts_multiple: bool,
    pub role: PinRole,
}

impl Pin {
    pub fn execution_in(node: NodeId) -> Self {
        Self::build(node, PinRole::ExecIn, PinKind::ExecutionIn, None, "In")
    }

    pub fn execution_out(node: NodeId, role: PinRole, label: &str) -> Self {
        Self::build(node, role, PinKind::ExecutionOut, None, label)
    }

    pub fn data_in(node: NodeId, role: PinRole, data_type: DataType, label: &str) -> Self {
        Self::build(node, role, PinKind::DataIn, Some(data_type), label)
    }

    pub fn data_out(node: NodeId, role: PinRole, data_type: DataType, label: &str) -> Self {
        Self::build(node, role, PinKind::DataOut, Some(data_type), label)
    }

    fn build(
        node: NodeId,
        role: PinRole,
        pin_kind: PinKind,
        data_type: Option<DataType>,
        label: &str,
    ) -> Self {
        Self {
            id: PinId::new(node, &role),
            pin_kind,
            data_type,
            label: label.to_string(),
            // a data input takes exactly one value
            accepts_multiple: pin_kind != PinKind::DataIn,
            role,
        }
    }
}
