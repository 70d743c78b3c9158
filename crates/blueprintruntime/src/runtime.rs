use crate::context::ExecutionContext;
use crate::executor::{Engine, RunOptions, RunReport};
use crate::observer::{EventBusObserver, ObserverSet, RunObserver};
use blueprintcore::{
    ActionAdapter, EventBus, ExecutionError, ExecutionEvent, FlowError, Graph, GraphDocument,
    GraphModel,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Engine, adapter and event bus wired together
pub struct FlowRuntime {
    engine: Arc<Engine>,
    event_bus: Arc<EventBus>,
    graphs: Arc<RwLock<HashMap<Uuid, GraphModel>>>,
    config: RuntimeConfig,
}

impl FlowRuntime {
    /// Create a runtime with default settings
    pub fn new(adapter: Arc<dyn ActionAdapter>) -> Self {
        Self::with_config(adapter, RuntimeConfig::default())
    }

    pub fn with_config(adapter: Arc<dyn ActionAdapter>, config: RuntimeConfig) -> Self {
        let engine = Engine::new(adapter).observe_pulled_nodes(config.observe_pulled_nodes);
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            engine: Arc::new(engine),
            event_bus,
            graphs: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register a graph model, returning the id it runs under
    pub async fn register_graph(&self, model: GraphModel) -> Uuid {
        let id = Uuid::new_v4();
        self.graphs.write().await.insert(id, model);
        id
    }

    /// Run the current snapshot of a registered graph
    ///
    /// Edits made through the model after the run started do not affect it.
    pub async fn run_registered(
        &self,
        graph_id: Uuid,
        options: RunOptions,
    ) -> Result<Option<RunReport>, ExecutionError> {
        let snapshot = {
            let graphs = self.graphs.read().await;
            match graphs.get(&graph_id) {
                Some(model) => model.snapshot(),
                None => return Ok(None),
            }
        };
        self.run(&snapshot, options).await.map(Some)
    }

    /// Run a graph, publishing its progress on the event bus
    pub async fn run(&self, graph: &Graph, options: RunOptions) -> Result<RunReport, ExecutionError> {
        self.run_observed(graph, options, &crate::NoopObserver).await
    }

    /// Run a graph with an extra observer alongside the event bus
    pub async fn run_observed(
        &self,
        graph: &Graph,
        options: RunOptions,
        observer: &dyn RunObserver,
    ) -> Result<RunReport, ExecutionError> {
        let context = ExecutionContext::new();
        let events = EventBusObserver::new(self.event_bus.clone(), context.run_id(), graph);
        let observers = ObserverSet::new(vec![&events as &dyn RunObserver, observer]);

        self.engine
            .run_with(graph, options, &observers, context)
            .await
    }

    /// Build a graph from interchange records and run it
    pub async fn run_document(
        &self,
        document: GraphDocument,
        options: RunOptions,
    ) -> Result<RunReport, FlowError> {
        let graph = document.into_graph()?;
        Ok(self.run(&graph, options).await?)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// Fire node callbacks for literals and converters evaluated on demand
    pub observe_pulled_nodes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            observe_pulled_nodes: true,
        }
    }
}
