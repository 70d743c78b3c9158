use crate::{NodeId, NodeKindTag, NodeOutcome, PinId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted while a graph runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        start_node: NodeId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        run_id: RunId,
        node_id: NodeId,
        kind: NodeKindTag,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        run_id: RunId,
        node_id: NodeId,
        outcome: NodeOutcome,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        node_id: Option<NodeId>,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// A data input fell back to a default value
    SoftResolution {
        run_id: RunId,
        node_id: NodeId,
        pin_id: PinId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            ExecutionEvent::RunStarted { run_id, .. }
            | ExecutionEvent::RunCompleted { run_id, .. }
            | ExecutionEvent::NodeStarted { run_id, .. }
            | ExecutionEvent::NodeCompleted { run_id, .. }
            | ExecutionEvent::NodeFailed { run_id, .. }
            | ExecutionEvent::SoftResolution { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for execution events
///
/// Sending never blocks; events are dropped when nobody is subscribed.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
}
