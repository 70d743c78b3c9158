//! Pull-based resolution of data inputs
//!
//! A data-in pin takes the value its producer published during this run. A
//! literal or converter that has not published yet is evaluated on the spot,
//! out of control-flow order. Action nodes are never pulled; their outputs
//! exist only once the walk has reached them.
//!
//! Invariant: a pull-only node is evaluated at most once per run. The
//! context's `evaluated` set is checked before every evaluation.

use crate::context::{ExecutionContext, SoftFailureReason, SoftResolutionFailure};
use crate::effects;
use crate::observer::RunObserver;
use blueprintcore::{
    ExecutionError, Graph, Node, NodeId, NodeKind, ParameterSpec, PinKind, PinRole,
};
use tracing::{debug, warn};

pub(crate) struct Resolver<'a> {
    graph: &'a Graph,
    observer: &'a dyn RunObserver,
    observe_pulled: bool,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(graph: &'a Graph, observer: &'a dyn RunObserver, observe_pulled: bool) -> Self {
        Self {
            graph,
            observer,
            observe_pulled,
        }
    }

    /// Give every data-in pin of `node` a value
    pub(crate) fn resolve_inputs(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
    ) -> Result<(), ExecutionError> {
        self.pull_producers(node.id, context)?;
        self.assign_inputs(node, context);
        Ok(())
    }

    /// Evaluate a pull-only node unless it already ran this run
    pub(crate) fn evaluate(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
    ) -> Result<(), ExecutionError> {
        if context.is_evaluated(node.id) {
            return Ok(());
        }
        self.pull_producers(node.id, context)?;
        self.evaluate_ready(node.id, context)
    }

    /// Evaluate every pull-only producer upstream of `consumer`, producers
    /// before their consumers, using an explicit stack.
    fn pull_producers(
        &self,
        consumer: NodeId,
        context: &mut ExecutionContext,
    ) -> Result<(), ExecutionError> {
        let mut stack = self.pending_producers(consumer, context);

        while let Some(&current) = stack.last() {
            if context.is_evaluated(current) {
                stack.pop();
                continue;
            }
            let pending = self.pending_producers(current, context);
            if pending.is_empty() {
                stack.pop();
                self.evaluate_ready(current, context)?;
            } else {
                stack.extend(pending);
            }
        }
        Ok(())
    }

    /// Pull-only producers feeding `node` that have not published yet
    fn pending_producers(&self, node: NodeId, context: &ExecutionContext) -> Vec<NodeId> {
        self.graph
            .incoming(node)
            .filter(|edge| !edge.is_execution_edge)
            .filter(|edge| context.variable(&edge.source_pin_id).is_none())
            .filter_map(|edge| self.graph.node(edge.source_node_id))
            .filter(|producer| producer.kind.is_pullable() && !context.is_evaluated(producer.id))
            .map(|producer| producer.id)
            .collect()
    }

    /// Run a pull-only node whose own inputs are available
    fn evaluate_ready(
        &self,
        id: NodeId,
        context: &mut ExecutionContext,
    ) -> Result<(), ExecutionError> {
        let Some(node) = self.graph.node(id) else {
            return Ok(());
        };
        if !context.mark_evaluated(id) {
            return Ok(());
        }

        debug!(node = %id, kind = node.kind.tag().as_str(), "Evaluating by pull");
        if self.observe_pulled {
            self.observer.on_node_start(id);
        }
        context.enter(id);
        self.assign_inputs(node, context);

        let publications = match &node.kind {
            NodeKind::ValueLiteral(config) => effects::literal(id, config)
                .map_err(|error| ExecutionError::UnhandledEffect { node: id, error })?,
            NodeKind::TypeConverter(config) => effects::convert(id, config, context),
            NodeKind::Begin | NodeKind::ActionInvocation(_) => return Ok(()),
        };

        let outcome = effects::published_outcome(&publications);
        for (pin, value) in publications {
            context.set_variable(pin, value);
        }
        context.record_result(id, outcome.clone());

        if self.observe_pulled {
            self.observer.on_node_complete(id, &outcome);
        }
        Ok(())
    }

    /// Copy upstream values onto the node's data-in pins, defaulting what is missing
    fn assign_inputs(&self, node: &Node, context: &mut ExecutionContext) {
        for pin in node.pins().into_iter().filter(|p| p.pin_kind == PinKind::DataIn) {
            let Some(data_type) = pin.data_type else {
                continue;
            };

            let upstream = self.graph.inbound_edge(node.id, &pin.id);
            let value = upstream.and_then(|edge| context.variable(&edge.source_pin_id).cloned());

            if let Some(value) = value {
                debug!(node = %node.id, pin = %pin.id, "Resolved input");
                context.set_variable(pin.id, value);
                continue;
            }

            let spec = declared_parameter(node, &pin.role);
            let declared = spec.and_then(|param| param.default.clone());
            let required = spec.map_or(false, |param| param.required);
            let reason = match upstream {
                Some(edge) if required => Some(SoftFailureReason::RequiredUnresolved {
                    producer: Some(edge.source_node_id),
                }),
                Some(edge) => Some(SoftFailureReason::NotYetProduced {
                    producer: edge.source_node_id,
                }),
                // an unconnected pin with a declared default is intentional
                None if declared.is_some() => None,
                None if required => Some(SoftFailureReason::RequiredUnresolved { producer: None }),
                None => Some(SoftFailureReason::Unconnected),
            };

            if let Some(reason) = reason {
                warn!(node = %node.id, pin = %pin.id, %reason, "Input falls back to default");
                let failure = SoftResolutionFailure {
                    node_id: node.id,
                    pin_id: pin.id.clone(),
                    reason,
                };
                self.observer.on_soft_failure(&failure);
                context.record_soft_failure(failure);
            }

            let value = declared.unwrap_or_else(|| data_type.default_value());
            context.set_variable(pin.id, value);
        }
    }
}

fn declared_parameter<'n>(node: &'n Node, role: &PinRole) -> Option<&'n ParameterSpec> {
    let (NodeKind::ActionInvocation(config), PinRole::Parameter(name)) = (&node.kind, role) else {
        return None;
    };
    config.parameters.iter().find(|param| &param.name == name)
}
