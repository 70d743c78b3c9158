use crate::context::SoftResolutionFailure;
use blueprintcore::{
    EventBus, ExecutionError, ExecutionEvent, Graph, NodeId, NodeKindTag, NodeOutcome, RunId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Callbacks fired while a run progresses
///
/// Nodes evaluated by pull resolution fire `on_node_start`/`on_node_complete`
/// too, so the callback counts are a full audit of executed effects.
pub trait RunObserver: Send + Sync {
    fn on_run_start(&self, _start: NodeId) {}

    fn on_node_start(&self, _node: NodeId) {}

    fn on_node_complete(&self, _node: NodeId, _outcome: &NodeOutcome) {}

    fn on_soft_failure(&self, _failure: &SoftResolutionFailure) {}

    /// Fired once when a run aborts
    fn on_error(&self, _error: &ExecutionError, _node: Option<NodeId>) {}

    /// Fired once when a run finishes without error
    fn on_complete(&self) {}
}

pub struct NoopObserver;

impl RunObserver for NoopObserver {}

type NodeCallback = Box<dyn Fn(NodeId) + Send + Sync>;
type CompleteCallback = Box<dyn Fn(NodeId, &NodeOutcome) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&ExecutionError, Option<NodeId>) + Send + Sync>;
type DoneCallback = Box<dyn Fn() + Send + Sync>;

/// Observer assembled from closures
#[derive(Default)]
pub struct Callbacks {
    node_start: Option<NodeCallback>,
    node_complete: Option<CompleteCallback>,
    error: Option<ErrorCallback>,
    complete: Option<DoneCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_node_start(mut self, f: impl Fn(NodeId) + Send + Sync + 'static) -> Self {
        self.node_start = Some(Box::new(f));
        self
    }

    pub fn on_node_complete(
        mut self,
        f: impl Fn(NodeId, &NodeOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.node_complete = Some(Box::new(f));
        self
    }

    pub fn on_error(
        mut self,
        f: impl Fn(&ExecutionError, Option<NodeId>) + Send + Sync + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl RunObserver for Callbacks {
    fn on_node_start(&self, node: NodeId) {
        if let Some(f) = &self.node_start {
            f(node);
        }
    }

    fn on_node_complete(&self, node: NodeId, outcome: &NodeOutcome) {
        if let Some(f) = &self.node_complete {
            f(node, outcome);
        }
    }

    fn on_error(&self, error: &ExecutionError, node: Option<NodeId>) {
        if let Some(f) = &self.error {
            f(error, node);
        }
    }

    fn on_complete(&self) {
        if let Some(f) = &self.complete {
            f();
        }
    }
}

/// Forwards every callback to each observer in order
pub struct ObserverSet<'a> {
    observers: Vec<&'a dyn RunObserver>,
}

impl<'a> ObserverSet<'a> {
    pub fn new(observers: Vec<&'a dyn RunObserver>) -> Self {
        Self { observers }
    }
}

impl RunObserver for ObserverSet<'_> {
    fn on_run_start(&self, start: NodeId) {
        self.observers.iter().for_each(|o| o.on_run_start(start));
    }

    fn on_node_start(&self, node: NodeId) {
        self.observers.iter().for_each(|o| o.on_node_start(node));
    }

    fn on_node_complete(&self, node: NodeId, outcome: &NodeOutcome) {
        self.observers
            .iter()
            .for_each(|o| o.on_node_complete(node, outcome));
    }

    fn on_soft_failure(&self, failure: &SoftResolutionFailure) {
        self.observers.iter().for_each(|o| o.on_soft_failure(failure));
    }

    fn on_error(&self, error: &ExecutionError, node: Option<NodeId>) {
        self.observers.iter().for_each(|o| o.on_error(error, node));
    }

    fn on_complete(&self) {
        self.observers.iter().for_each(|o| o.on_complete());
    }
}

/// Publishes the callbacks of one run onto an [`EventBus`]
pub struct EventBusObserver {
    bus: Arc<EventBus>,
    run_id: RunId,
    kinds: HashMap<NodeId, NodeKindTag>,
    started: Instant,
}

impl EventBusObserver {
    pub fn new(bus: Arc<EventBus>, run_id: RunId, graph: &Graph) -> Self {
        Self {
            bus,
            run_id,
            kinds: graph.nodes().map(|n| (n.id, n.kind.tag())).collect(),
            started: Instant::now(),
        }
    }

    fn finish(&self, success: bool) {
        self.bus.emit(ExecutionEvent::RunCompleted {
            run_id: self.run_id,
            success,
            duration_ms: self.started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
    }
}

impl RunObserver for EventBusObserver {
    fn on_run_start(&self, start: NodeId) {
        self.bus.emit(ExecutionEvent::RunStarted {
            run_id: self.run_id,
            start_node: start,
            timestamp: Utc::now(),
        });
    }

    fn on_node_start(&self, node: NodeId) {
        let Some(kind) = self.kinds.get(&node) else {
            return;
        };
        self.bus.emit(ExecutionEvent::NodeStarted {
            run_id: self.run_id,
            node_id: node,
            kind: *kind,
            timestamp: Utc::now(),
        });
    }

    fn on_node_complete(&self, node: NodeId, outcome: &NodeOutcome) {
        self.bus.emit(ExecutionEvent::NodeCompleted {
            run_id: self.run_id,
            node_id: node,
            outcome: outcome.clone(),
            timestamp: Utc::now(),
        });
    }

    fn on_soft_failure(&self, failure: &SoftResolutionFailure) {
        self.bus.emit(ExecutionEvent::SoftResolution {
            run_id: self.run_id,
            node_id: failure.node_id,
            pin_id: failure.pin_id.clone(),
            reason: failure.reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn on_error(&self, error: &ExecutionError, node: Option<NodeId>) {
        self.bus.emit(ExecutionEvent::NodeFailed {
            run_id: self.run_id,
            node_id: node,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        self.finish(false);
    }

    fn on_complete(&self) {
        self.finish(true);
    }
}
