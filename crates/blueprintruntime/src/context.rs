use blueprintcore::{NodeId, NodeOutcome, PinId, RunId, Value};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Per-run store of pin values and node outcomes
///
/// Owned by exactly one run. After the run it stays readable for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    run_id: RunId,
    variables: BTreeMap<PinId, Value>,
    results: BTreeMap<NodeId, NodeOutcome>,
    /// Pull-only nodes already evaluated this run; never evaluated twice
    evaluated: BTreeSet<NodeId>,
    soft_failures: Vec<SoftResolutionFailure>,
    trace: Vec<NodeId>,
    current_node: Option<NodeId>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    pub fn with_run_id(run_id: RunId) -> Self {
        Self {
            run_id,
            variables: BTreeMap::new(),
            results: BTreeMap::new(),
            evaluated: BTreeSet::new(),
            soft_failures: Vec::new(),
            trace: Vec::new(),
            current_node: None,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn variable(&self, pin: &PinId) -> Option<&Value> {
        self.variables.get(pin)
    }

    pub fn variables(&self) -> &BTreeMap<PinId, Value> {
        &self.variables
    }

    pub fn result(&self, node: NodeId) -> Option<&NodeOutcome> {
        self.results.get(&node)
    }

    pub fn results(&self) -> &BTreeMap<NodeId, NodeOutcome> {
        &self.results
    }

    /// Inputs that fell back to a default value
    pub fn soft_failures(&self) -> &[SoftResolutionFailure] {
        &self.soft_failures
    }

    /// Every node whose effect ran, in execution order
    pub fn trace(&self) -> &[NodeId] {
        &self.trace
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current_node
    }

    pub fn is_evaluated(&self, node: NodeId) -> bool {
        self.evaluated.contains(&node)
    }

    pub(crate) fn set_variable(&mut self, pin: PinId, value: Value) {
        self.variables.insert(pin, value);
    }

    pub(crate) fn enter(&mut self, node: NodeId) {
        self.current_node = Some(node);
        self.trace.push(node);
    }

    pub(crate) fn record_result(&mut self, node: NodeId, outcome: NodeOutcome) {
        self.results.insert(node, outcome);
    }

    pub(crate) fn mark_evaluated(&mut self, node: NodeId) -> bool {
        self.evaluated.insert(node)
    }

    pub(crate) fn record_soft_failure(&mut self, failure: SoftResolutionFailure) {
        self.soft_failures.push(failure);
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A data input that could not be resolved from upstream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftResolutionFailure {
    pub node_id: NodeId,
    pub pin_id: PinId,
    pub reason: SoftFailureReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SoftFailureReason {
    /// No data edge feeds the pin
    Unconnected,
    /// The producer has not published yet and cannot be pulled
    NotYetProduced { producer: NodeId },
    /// A parameter marked required got no value; `producer` is set when an
    /// edge feeds the pin
    RequiredUnresolved { producer: Option<NodeId> },
}

impl fmt::Display for SoftFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftFailureReason::Unconnected => f.write_str("input is not connected"),
            SoftFailureReason::NotYetProduced { producer } => {
                write!(f, "node {} has not produced a value yet", producer)
            }
            SoftFailureReason::RequiredUnresolved { producer: None } => {
                f.write_str("required input is not connected")
            }
            SoftFailureReason::RequiredUnresolved {
                producer: Some(producer),
            } => write!(f, "required input from node {} has no value yet", producer),
        }
    }
}
