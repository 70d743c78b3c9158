use crate::{DataType, EdgeId, NodeId, PinId, PinKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a candidate edge was rejected
///
/// Returned before the graph is touched; a rejected edge never enters the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Cannot connect pins within the same node ({0})")]
    SelfLoop(NodeId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Pin {pin} not found on node {node}")]
    PinNotFound { node: NodeId, pin: PinId },

    #[error("Cannot connect {from} pin to {to} pin")]
    KindMismatch { from: PinKind, to: PinKind },

    #[error("Connections run from an output to an input, got {from} to {to}")]
    DirectionMismatch { from: PinKind, to: PinKind },

    #[error("Data type mismatch: {from} cannot connect to {to}")]
    TypeMismatch { from: DataType, to: DataType },

    #[error("Input pin {pin} is already connected by edge {edge}")]
    InputAlreadyConnected { pin: PinId, edge: EdgeId },

    #[error("Connection from {from} to {to} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },

    #[error("No edge ids left to allocate")]
    EdgeIdsExhausted,
}

/// Failure that aborts a run
#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("No start node found")]
    NoStartNode,

    #[error("Action failed on node {node}: {message}")]
    ActionInvocationFailure { node: NodeId, message: String },

    #[error("Node {node} failed: {error}")]
    UnhandledEffect {
        node: NodeId,
        #[source]
        error: NodeError,
    },
}

impl ExecutionError {
    /// The node the failure originated from, if any
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            ExecutionError::NoStartNode => None,
            ExecutionError::ActionInvocationFailure { node, .. } => Some(*node),
            ExecutionError::UnhandledEffect { node, .. } => Some(*node),
        }
    }
}

/// Error raised by a node's own effect
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Literal of type {expected} holds {actual}")]
    InvalidLiteral { expected: DataType, actual: String },
}

/// Error reported by an action adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Unknown action: {component}.{action}")]
    UnknownAction { component: String, action: String },

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Action failed: {0}")]
    Failed(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Error building a graph from interchange records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Id {0} is outside the allocatable range")]
    IdOutOfRange(u64),

    #[error("Invalid config for node {node}: {message}")]
    InvalidNodeConfig { node: NodeId, message: String },

    #[error("Invalid edge {edge}: {error}")]
    InvalidEdge {
        edge: EdgeId,
        #[source]
        error: ValidationError,
    },
}
