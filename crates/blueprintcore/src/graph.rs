//! Graph snapshots and the editing model
//!
//! A [`Graph`] is an arena of nodes and edges keyed by stable ids. It is only
//! mutated through [`GraphModel`], which holds it behind an `Arc` and copies
//! on write, so a snapshot handed to a run never changes underneath it.

use crate::validate::validate_connection;
use crate::{GraphError, Node, NodeId, NodeKind, Pin, PinFamily, PinId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Ids run below this value, so the next id can always be computed
pub const MAX_ID: u64 = u64::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection between an output pin and an input pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub source_pin_id: PinId,
    pub target_node_id: NodeId,
    pub target_pin_id: PinId,
    /// Derived from the pins on insertion; the value in an interchange record is ignored
    #[serde(default)]
    pub is_execution_edge: bool,
}

/// An edge the author wants to add
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCandidate {
    pub source_node_id: NodeId,
    pub source_pin_id: PinId,
    pub target_node_id: NodeId,
    pub target_pin_id: PinId,
}

impl EdgeCandidate {
    pub fn new(
        source_node_id: NodeId,
        source_pin_id: impl Into<PinId>,
        target_node_id: NodeId,
        target_pin_id: impl Into<PinId>,
    ) -> Self {
        Self {
            source_node_id,
            source_pin_id: source_pin_id.into(),
            target_node_id,
            target_pin_id: target_pin_id.into(),
        }
    }

    /// Candidate between two already-derived pins
    pub fn between(source: &Pin, source_node: NodeId, target: &Pin, target_node: NodeId) -> Self {
        Self::new(source_node, source.id.clone(), target_node, target.id.clone())
    }
}

impl From<&Edge> for EdgeCandidate {
    fn from(edge: &Edge) -> Self {
        Self {
            source_node_id: edge.source_node_id,
            source_pin_id: edge.source_pin_id.clone(),
            target_node_id: edge.target_node_id,
            target_pin_id: edge.target_pin_id.clone(),
        }
    }
}

/// Immutable view of nodes and edges
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    next_node: u64,
    next_edge: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn pin(&self, node: NodeId, pin: &PinId) -> Option<Pin> {
        self.node(node).and_then(|n| n.pin(pin))
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.source_node_id == node)
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.target_node_id == node)
    }

    /// The edge feeding an input pin, if any
    pub fn inbound_edge(&self, node: NodeId, pin: &PinId) -> Option<&Edge> {
        self.incoming(node).find(|e| &e.target_pin_id == pin)
    }

    /// Build a graph from interchange records, validating every edge in order
    pub fn from_document(document: GraphDocument) -> Result<Self, GraphError> {
        let mut graph = Graph::new();

        for node in document.nodes {
            if node.id.0 > MAX_ID {
                return Err(GraphError::IdOutOfRange(node.id.0));
            }
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            node.kind.check_pins(node.id)?;
            graph.next_node = graph.next_node.max(node.id.0 + 1);
            graph.nodes.insert(node.id, node);
        }

        for edge in document.edges {
            if edge.id.0 > MAX_ID {
                return Err(GraphError::IdOutOfRange(edge.id.0));
            }
            if graph.edges.contains_key(&edge.id) {
                return Err(GraphError::DuplicateEdge(edge.id));
            }
            graph
                .connect(EdgeCandidate::from(&edge), Some(edge.id))
                .map_err(|error| GraphError::InvalidEdge { edge: edge.id, error })?;
        }

        Ok(graph)
    }

    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            name: None,
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    fn next_node_id(&self) -> Result<NodeId, GraphError> {
        if self.next_node > MAX_ID {
            return Err(GraphError::IdOutOfRange(self.next_node));
        }
        Ok(NodeId(self.next_node))
    }

    fn connect(
        &mut self,
        candidate: EdgeCandidate,
        id: Option<EdgeId>,
    ) -> Result<EdgeId, ValidationError> {
        let family = validate_connection(self, &candidate)?;

        let id = id.unwrap_or(EdgeId(self.next_edge));
        if id.0 > MAX_ID {
            return Err(ValidationError::EdgeIdsExhausted);
        }
        self.next_edge = self.next_edge.max(id.0 + 1);
        self.edges.insert(
            id,
            Edge {
                id,
                source_node_id: candidate.source_node_id,
                source_pin_id: candidate.source_pin_id,
                target_node_id: candidate.target_node_id,
                target_pin_id: candidate.target_pin_id,
                is_execution_edge: family == PinFamily::Execution,
            },
        );
        Ok(id)
    }

    fn disconnect_node(&mut self, node: NodeId) -> Vec<EdgeId> {
        let touching: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.source_node_id == node || e.target_node_id == node)
            .map(|e| e.id)
            .collect();
        for id in &touching {
            self.edges.remove(id);
        }
        touching
    }
}

/// Editing surface over a copy-on-write graph
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    graph: Arc<Graph>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Cheap handle to the current state; later edits do not affect it
    pub fn snapshot(&self) -> Arc<Graph> {
        Arc::clone(&self.graph)
    }

    /// Insert a node under the next free id
    ///
    /// Fails without touching the graph when the kind declares two pins with
    /// the same id or when the id space is used up.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        self.insert(kind, None)
    }

    pub fn add_labeled_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        self.insert(kind, Some(label.into()))
    }

    fn insert(&mut self, kind: NodeKind, label: Option<String>) -> Result<NodeId, GraphError> {
        let id = self.graph.next_node_id()?;
        kind.check_pins(id)?;
        let graph = Arc::make_mut(&mut self.graph);
        graph.next_node = id.0 + 1;
        graph.nodes.insert(id, Node { id, kind, label });
        Ok(id)
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.graph.nodes.contains_key(&id) {
            return None;
        }
        let graph = Arc::make_mut(&mut self.graph);
        let dropped = graph.disconnect_node(id);
        tracing::debug!(node = %id, edges = dropped.len(), "Removed node");
        graph.nodes.remove(&id)
    }

    /// Validate and insert an edge; the graph is untouched on rejection
    pub fn add_edge(&mut self, candidate: EdgeCandidate) -> Result<EdgeId, ValidationError> {
        validate_connection(&self.graph, &candidate)?;
        Arc::make_mut(&mut self.graph).connect(candidate, None)
    }

    /// Connect two pins by id
    pub fn connect(
        &mut self,
        source: NodeId,
        source_pin: &PinId,
        target: NodeId,
        target_pin: &PinId,
    ) -> Result<EdgeId, ValidationError> {
        self.add_edge(EdgeCandidate::new(
            source,
            source_pin.clone(),
            target,
            target_pin.clone(),
        ))
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        if !self.graph.edges.contains_key(&id) {
            return None;
        }
        Arc::make_mut(&mut self.graph).edges.remove(&id)
    }

    /// Replace a node's configuration, dropping edges that no longer fit
    ///
    /// Returns the ids of the dropped edges. Pin ids are derived from slot
    /// names, so a pin that survives the change keeps its id even when its
    /// data type changed. Values recorded against that id by earlier runs
    /// describe the old configuration.
    pub fn reconfigure_node(&mut self, id: NodeId, kind: NodeKind) -> Result<Vec<EdgeId>, GraphError> {
        if !self.graph.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }
        kind.check_pins(id)?;

        let mut next = (*self.graph).clone();
        let touching = next.disconnect_node(id);
        if let Some(node) = next.nodes.get_mut(&id) {
            node.kind = kind;
        }

        let mut dropped = Vec::new();
        for edge_id in touching {
            let Some(edge) = self.graph.edges.get(&edge_id) else {
                continue;
            };
            if next.connect(EdgeCandidate::from(edge), Some(edge_id)).is_err() {
                dropped.push(edge_id);
            }
        }

        tracing::debug!(node = %id, dropped = dropped.len(), "Reconfigured node");
        self.graph = Arc::new(next);
        Ok(dropped)
    }
}

/// Plain node/edge interchange record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphDocument {
    pub fn into_graph(self) -> Result<Graph, GraphError> {
        Graph::from_document(self)
    }
}
