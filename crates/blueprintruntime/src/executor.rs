use crate::context::ExecutionContext;
use crate::effects;
use crate::observer::RunObserver;
use crate::resolve::Resolver;
use blueprintcore::catalog::{has_branch_pins, has_execution_input};
use blueprintcore::{
    ActionAdapter, ActionConfig, ActionError, ActionResult, ExecutionError, Graph, Node, NodeError,
    NodeId, NodeKind, NodeOutcome, PinId, PinRole, RunId,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Walks a graph's execution edges from a start node
///
/// A run is strictly sequential: sibling branches are walked one at a time,
/// depth-first, in edge insertion order. The engine holds no per-run state,
/// so one engine may serve many concurrent runs, each with its own context.
pub struct Engine {
    adapter: Arc<dyn ActionAdapter>,
    observe_pulled_nodes: bool,
}

impl Engine {
    pub fn new(adapter: Arc<dyn ActionAdapter>) -> Self {
        Self {
            adapter,
            observe_pulled_nodes: true,
        }
    }

    /// Whether nodes evaluated by pull resolution fire observer callbacks
    pub fn observe_pulled_nodes(mut self, enabled: bool) -> Self {
        self.observe_pulled_nodes = enabled;
        self
    }

    /// Run `graph` with a fresh context
    pub async fn run(
        &self,
        graph: &Graph,
        options: RunOptions,
        observer: &dyn RunObserver,
    ) -> Result<RunReport, ExecutionError> {
        self.run_with(graph, options, observer, ExecutionContext::new())
            .await
    }

    /// Run `graph` with a caller-supplied context
    pub async fn run_with(
        &self,
        graph: &Graph,
        options: RunOptions,
        observer: &dyn RunObserver,
        mut context: ExecutionContext,
    ) -> Result<RunReport, ExecutionError> {
        let started = Instant::now();
        self.run_in(graph, options, observer, &mut context).await?;
        Ok(RunReport {
            run_id: context.run_id(),
            duration_ms: started.elapsed().as_millis() as u64,
            context,
        })
    }

    /// Run `graph` against a borrowed context, which stays inspectable when
    /// the run fails
    #[instrument(skip_all, fields(run_id = %context.run_id()))]
    pub async fn run_in(
        &self,
        graph: &Graph,
        options: RunOptions,
        observer: &dyn RunObserver,
        context: &mut ExecutionContext,
    ) -> Result<(), ExecutionError> {
        let result = self.walk(graph, &options, observer, context).await;

        match &result {
            Ok(()) => {
                info!(nodes = context.trace().len(), "Run completed");
                observer.on_complete();
            }
            Err(e) => {
                error!(node = ?e.node_id(), "Run aborted: {}", e);
                observer.on_error(e, e.node_id());
            }
        }
        result
    }

    async fn walk(
        &self,
        graph: &Graph,
        options: &RunOptions,
        observer: &dyn RunObserver,
        context: &mut ExecutionContext,
    ) -> Result<(), ExecutionError> {
        let start = select_start(graph, options.start)?;
        info!(start = %start, "Starting run");
        observer.on_run_start(start);

        let resolver = Resolver::new(graph, observer, self.observe_pulled_nodes);
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let Some(node) = graph.node(id) else {
                warn!(node = %id, "Execution edge points at a missing node");
                continue;
            };

            if node.kind.is_pullable() {
                resolver.evaluate(node, context)?;
                continue;
            }

            observer.on_node_start(id);
            context.enter(id);
            resolver.resolve_inputs(node, context)?;

            let outcome = self
                .execute(node, context, &options.cancellation)
                .await
                .map_err(|error| ExecutionError::UnhandledEffect { node: id, error })?;
            observer.on_node_complete(id, &outcome);

            let branching = has_branch_pins(&node.kind);
            if let NodeOutcome::Invoked(result) = &outcome {
                if !result.success && !branching {
                    return Err(ExecutionError::ActionInvocationFailure {
                        node: id,
                        message: result
                            .error
                            .clone()
                            .unwrap_or_else(|| format!("Action execution failed for node {}", id)),
                    });
                }
            }

            let next = follow(graph, node, &outcome, branching);
            debug!(node = %id, next = ?next, "Following execution edges");
            // reversed so the first edge is walked first
            stack.extend(next.into_iter().rev());
        }

        Ok(())
    }

    /// Run a walked node's effect and record its outcome
    async fn execute(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
        cancellation: &CancellationToken,
    ) -> Result<NodeOutcome, NodeError> {
        let outcome = match &node.kind {
            NodeKind::Begin => NodeOutcome::Began,
            NodeKind::ActionInvocation(config) => {
                let result = self.invoke(node.id, config, context, cancellation).await?;
                for (pin, value) in effects::project_result(node.id, config, &result) {
                    context.set_variable(pin, value);
                }
                NodeOutcome::Invoked(result)
            }
            // walked nodes always carry execution pins
            NodeKind::ValueLiteral(_) | NodeKind::TypeConverter(_) => {
                return Err(NodeError::Configuration(format!(
                    "Node {} cannot be executed by the walk",
                    node.id
                )))
            }
        };

        context.record_result(node.id, outcome.clone());
        Ok(outcome)
    }

    async fn invoke(
        &self,
        node: NodeId,
        config: &ActionConfig,
        context: &ExecutionContext,
        cancellation: &CancellationToken,
    ) -> Result<ActionResult, NodeError> {
        if config.component_id.trim().is_empty() || config.action_id.trim().is_empty() {
            return Err(NodeError::Configuration(format!(
                "Node {} is not bound to an action",
                node
            )));
        }

        let parameters = effects::parameters(node, config, context);
        info!(
            node = %node,
            component = %config.component_id,
            action = %config.action_id,
            "Invoking action"
        );

        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => ActionResult::from(ActionError::Cancelled),
            result = self.adapter.invoke(&config.component_id, &config.action_id, parameters) => {
                result.unwrap_or_else(ActionResult::from)
            }
        };

        if !result.success {
            warn!(
                node = %node,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Action reported failure"
            );
        }
        Ok(result)
    }
}

/// Targets of the execution edges to follow after a node ran
fn follow(graph: &Graph, node: &Node, outcome: &NodeOutcome, branching: bool) -> Vec<NodeId> {
    let branch = branching.then(|| {
        let role = if outcome.is_success() {
            PinRole::Success
        } else {
            PinRole::Error
        };
        PinId::new(node.id, &role)
    });

    graph
        .outgoing(node.id)
        .filter(|edge| edge.is_execution_edge)
        .filter(|edge| branch.as_ref().map_or(true, |pin| &edge.source_pin_id == pin))
        .map(|edge| edge.target_node_id)
        .collect()
}

/// Pick the node a run starts from
///
/// An explicit hint wins. Otherwise the Begin node, then the first node with
/// an execution input that nothing flows into.
pub fn select_start(graph: &Graph, hint: Option<NodeId>) -> Result<NodeId, ExecutionError> {
    if let Some(id) = hint {
        return match graph.node(id) {
            Some(node) if is_walkable(&node.kind) => Ok(id),
            _ => Err(ExecutionError::NoStartNode),
        };
    }

    let begins: Vec<NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind, NodeKind::Begin))
        .map(|n| n.id)
        .collect();
    if let Some(first) = begins.first() {
        if begins.len() > 1 {
            warn!(count = begins.len(), chosen = %first, "Several begin nodes; using the first");
        }
        return Ok(*first);
    }

    graph
        .nodes()
        .filter(|n| has_execution_input(&n.kind))
        .find(|n| !graph.incoming(n.id).any(|e| e.is_execution_edge))
        .map(|n| n.id)
        .ok_or(ExecutionError::NoStartNode)
}

fn is_walkable(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Begin) || has_execution_input(kind)
}

/// How to run a graph
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub start: Option<NodeId>,
    /// Cancelling aborts a pending action call, which then counts as failed
    pub cancellation: CancellationToken,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(mut self, node: NodeId) -> Self {
        self.start = Some(node);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub duration_ms: u64,
    pub context: ExecutionContext,
}
