//! Connection validation
//!
//! Checks run in a fixed order and stop at the first failure, so a rejected
//! candidate always reports the same reason regardless of what else is wrong.

use crate::{EdgeCandidate, Graph, NodeId, PinFamily, ValidationError};
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;

/// Decide whether `candidate` may be added to `graph`.
///
/// On success returns the family the new edge belongs to. Never mutates.
pub fn validate_connection(
    graph: &Graph,
    candidate: &EdgeCandidate,
) -> Result<PinFamily, ValidationError> {
    if candidate.source_node_id == candidate.target_node_id {
        return Err(ValidationError::SelfLoop(candidate.source_node_id));
    }

    let source = graph
        .node(candidate.source_node_id)
        .ok_or(ValidationError::NodeNotFound(candidate.source_node_id))?;
    let target = graph
        .node(candidate.target_node_id)
        .ok_or(ValidationError::NodeNotFound(candidate.target_node_id))?;

    let source_pin = source
        .pin(&candidate.source_pin_id)
        .ok_or_else(|| ValidationError::PinNotFound {
            node: source.id,
            pin: candidate.source_pin_id.clone(),
        })?;
    let target_pin = target
        .pin(&candidate.target_pin_id)
        .ok_or_else(|| ValidationError::PinNotFound {
            node: target.id,
            pin: candidate.target_pin_id.clone(),
        })?;

    let family = source_pin.pin_kind.family();
    if family != target_pin.pin_kind.family() {
        return Err(ValidationError::KindMismatch {
            from: source_pin.pin_kind,
            to: target_pin.pin_kind,
        });
    }

    if !source_pin.pin_kind.is_output() || !target_pin.pin_kind.is_input() {
        return Err(ValidationError::DirectionMismatch {
            from: source_pin.pin_kind,
            to: target_pin.pin_kind,
        });
    }

    if family == PinFamily::Data {
        if let (Some(from), Some(to)) = (source_pin.data_type, target_pin.data_type) {
            if from != to {
                return Err(ValidationError::TypeMismatch { from, to });
            }
        }
    }

    if !target_pin.accepts_multiple {
        if let Some(existing) = graph.inbound_edge(target.id, &target_pin.id) {
            return Err(ValidationError::InputAlreadyConnected {
                pin: target_pin.id,
                edge: existing.id,
            });
        }
    }

    if closes_cycle(graph, candidate.source_node_id, candidate.target_node_id) {
        return Err(ValidationError::CycleDetected {
            from: candidate.source_node_id,
            to: candidate.target_node_id,
        });
    }

    Ok(family)
}

/// Whether `target` can reach `source` once the candidate edge exists.
///
/// Edges of both kinds count: a loop through any mix of control and data
/// edges can neither be walked nor pulled through.
fn closes_cycle(graph: &Graph, source: NodeId, target: NodeId) -> bool {
    let mut reach = DiGraphMap::<NodeId, ()>::new();
    for node in graph.nodes() {
        reach.add_node(node.id);
    }
    for edge in graph.edges() {
        reach.add_edge(edge.source_node_id, edge.target_node_id, ());
    }
    reach.add_edge(source, target, ());

    has_path_connecting(&reach, target, source, None)
}
