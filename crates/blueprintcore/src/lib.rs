//! Core abstractions for the blueprint graph engine
//!
//! Values and data types, pins and the node catalog, the graph model with its
//! connection validator, interchange records, and the action adapter contract.
//! Running graphs lives in `blueprintruntime`.

mod action;
pub mod catalog;
pub mod coerce;
mod error;
pub mod events;
mod graph;
mod node;
mod pin;
pub mod validate;
mod value;

pub use action::{ActionAdapter, ActionDescriptor, ActionResult, NodeOutcome, Parameters};
pub use error::{ActionError, ExecutionError, FlowError, GraphError, NodeError, ValidationError};
pub use events::*;
pub use graph::{Edge, EdgeCandidate, EdgeId, Graph, GraphDocument, GraphModel, MAX_ID};
pub use node::{
    ActionConfig, ConverterConfig, LiteralConfig, Node, NodeId, NodeKind, NodeKindTag, NodeRecord,
    ParameterSpec, ResultField,
};
pub use pin::{Pin, PinFamily, PinId, PinKind, PinRole};
pub use value::{DataType, Value};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
