use async_trait::async_trait;
use blueprintcore::{
    ActionAdapter, ActionConfig, ActionError, ActionResult, DataType, ExecutionError,
    ExecutionEvent, GraphModel, NodeError, NodeId, NodeKind, NodeOutcome, ParameterSpec,
    Parameters, PinId, PinRole, Value,
};
use blueprintruntime::{
    Callbacks, Engine, ExecutionContext, FlowRuntime, NoopObserver, RunObserver, RunOptions,
    SoftFailureReason, SoftResolutionFailure,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Initialize tracing for tests
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Adapter answering from a script and recording every call
#[derive(Default)]
struct ScriptedAdapter {
    responses: HashMap<String, Result<ActionResult, ActionError>>,
    calls: Mutex<Vec<(String, Parameters)>>,
}

impl ScriptedAdapter {
    fn respond(mut self, action: &str, response: Result<ActionResult, ActionError>) -> Self {
        self.responses.insert(action.to_string(), response);
        self
    }

    fn calls(&self) -> Vec<(String, Parameters)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionAdapter for ScriptedAdapter {
    async fn invoke(
        &self,
        _component_id: &str,
        action_id: &str,
        parameters: Parameters,
    ) -> Result<ActionResult, ActionError> {
        self.calls
            .lock()
            .unwrap()
            .push((action_id.to_string(), parameters));
        if action_id == "hang" {
            std::future::pending::<()>().await;
        }
        self.responses
            .get(action_id)
            .cloned()
            .unwrap_or_else(|| Ok(ActionResult::empty()))
    }
}

/// Observer recording the node callbacks
#[derive(Clone, Default)]
struct Recorder {
    started: Arc<Mutex<Vec<NodeId>>>,
    errors: Arc<Mutex<Vec<Option<NodeId>>>>,
    completed: Arc<Mutex<usize>>,
}

impl Recorder {
    fn callbacks(&self) -> Callbacks {
        let started = self.started.clone();
        let errors = self.errors.clone();
        let completed = self.completed.clone();
        Callbacks::new()
            .on_node_start(move |node| started.lock().unwrap().push(node))
            .on_error(move |_, node| errors.lock().unwrap().push(node))
            .on_complete(move || *completed.lock().unwrap() += 1)
    }

    fn started(&self) -> Vec<NodeId> {
        self.started.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<Option<NodeId>> {
        self.errors.lock().unwrap().clone()
    }

    fn completed(&self) -> usize {
        *self.completed.lock().unwrap()
    }
}

/// Observer keeping the reasons of soft resolution failures
#[derive(Default)]
struct SoftFailures(Mutex<Vec<SoftFailureReason>>);

impl RunObserver for SoftFailures {
    fn on_soft_failure(&self, failure: &SoftResolutionFailure) {
        self.0.lock().unwrap().push(failure.reason.clone());
    }
}

fn pin(node: NodeId, role: PinRole) -> PinId {
    PinId::new(node, &role)
}

fn param(node: NodeId, name: &str) -> PinId {
    PinId::new(node, &PinRole::Parameter(name.to_string()))
}

fn action(action_id: &str, params: &[(&str, DataType)]) -> ActionConfig {
    params
        .iter()
        .fold(ActionConfig::new("test", action_id), |config, (name, data_type)| {
            config.with_parameter(*name, *data_type)
        })
}

fn then(model: &mut GraphModel, from: NodeId, role: PinRole, to: NodeId) {
    model
        .connect(from, &pin(from, role), to, &pin(to, PinRole::ExecIn))
        .unwrap();
}

fn feed(model: &mut GraphModel, from: NodeId, to: NodeId, name: &str) {
    model
        .connect(from, &pin(from, PinRole::Output), to, &param(to, name))
        .unwrap();
}

fn parameters(pairs: &[(&str, Value)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_parameters_resolved_before_call() {
    init_tracing();
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let sum = model.add_node(NodeKind::action(action(
        "sum",
        &[("a", DataType::Number), ("b", DataType::Number)],
    ))).unwrap();
    let log = model.add_node(NodeKind::action(action("log", &[]))).unwrap();
    let five = model.add_node(NodeKind::literal(DataType::Number, 5.0)).unwrap();
    let three = model.add_node(NodeKind::literal(DataType::Number, 3.0)).unwrap();
    then(&mut model, begin, PinRole::Next, sum);
    then(&mut model, sum, PinRole::Next, log);
    feed(&mut model, five, sum, "a");
    feed(&mut model, three, sum, "b");

    let adapter = Arc::new(ScriptedAdapter::default().respond("sum", Ok(ActionResult::ok(8.0))));
    let engine = Engine::new(adapter.clone());
    let report = engine
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "sum");
    assert_eq!(
        calls[0].1,
        parameters(&[("a", Value::Number(5.0)), ("b", Value::Number(3.0))])
    );
    assert_eq!(calls[1].0, "log");
    assert_eq!(report.context.result(begin), Some(&NodeOutcome::Began));
    assert!(report.context.result(sum).unwrap().is_success());
    assert!(report.context.soft_failures().is_empty());
}

#[tokio::test]
async fn test_converters_chain_string_to_number_to_boolean() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let check = model.add_node(NodeKind::action(action(
        "check",
        &[("n", DataType::Number), ("flag", DataType::Boolean)],
    ))).unwrap();
    let text = model.add_node(NodeKind::literal(DataType::String, "42")).unwrap();
    let to_number = model.add_node(NodeKind::converter(DataType::String, DataType::Number)).unwrap();
    let to_bool = model.add_node(NodeKind::converter(DataType::Number, DataType::Boolean)).unwrap();
    then(&mut model, begin, PinRole::Next, check);
    model
        .connect(text, &pin(text, PinRole::Output), to_number, &pin(to_number, PinRole::Input))
        .unwrap();
    model
        .connect(to_number, &pin(to_number, PinRole::Output), to_bool, &pin(to_bool, PinRole::Input))
        .unwrap();
    feed(&mut model, to_number, check, "n");
    feed(&mut model, to_bool, check, "flag");

    let adapter = Arc::new(ScriptedAdapter::default());
    let recorder = Recorder::default();
    Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &recorder.callbacks())
        .await
        .unwrap();

    assert_eq!(
        adapter.calls()[0].1,
        parameters(&[("flag", Value::Bool(true)), ("n", Value::Number(42.0))])
    );
    let to_number_starts = recorder.started().iter().filter(|n| **n == to_number).count();
    assert_eq!(to_number_starts, 1);
}

#[tokio::test]
async fn test_empty_string_converts_to_zero() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let check = model.add_node(NodeKind::action(action("check", &[("n", DataType::Number)]))).unwrap();
    let text = model.add_node(NodeKind::literal(DataType::String, "")).unwrap();
    let to_number = model.add_node(NodeKind::converter(DataType::String, DataType::Number)).unwrap();
    then(&mut model, begin, PinRole::Next, check);
    model
        .connect(text, &pin(text, PinRole::Output), to_number, &pin(to_number, PinRole::Input))
        .unwrap();
    feed(&mut model, to_number, check, "n");

    let adapter = Arc::new(ScriptedAdapter::default());
    let report = Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(adapter.calls()[0].1, parameters(&[("n", Value::Number(0.0))]));
    assert_eq!(
        report.context.result(to_number),
        Some(&NodeOutcome::Published {
            value: Value::Number(0.0)
        })
    );
}

/// Begin -> router, router.Success -> on_success, router.Error -> on_error
fn branching_graph(router_action: &str) -> (GraphModel, NodeId, NodeId, NodeId) {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let router = model.add_node(NodeKind::action(action(router_action, &[]).routing_errors())).unwrap();
    let on_success = model.add_node(NodeKind::action(action("success", &[]))).unwrap();
    let on_error = model.add_node(NodeKind::action(action("error", &[]))).unwrap();
    then(&mut model, begin, PinRole::Next, router);
    then(&mut model, router, PinRole::Success, on_success);
    then(&mut model, router, PinRole::Error, on_error);
    (model, router, on_success, on_error)
}

#[tokio::test]
async fn test_failure_follows_error_branch_only() {
    let (model, router, on_success, on_error) = branching_graph("route");
    let adapter = Arc::new(
        ScriptedAdapter::default().respond("route", Ok(ActionResult::failure("nope"))),
    );
    let recorder = Recorder::default();

    Engine::new(adapter)
        .run(&model.snapshot(), RunOptions::default(), &recorder.callbacks())
        .await
        .unwrap();

    let started = recorder.started();
    assert!(started.contains(&router));
    assert!(started.contains(&on_error));
    assert!(!started.contains(&on_success));
    assert_eq!(recorder.completed(), 1);
    assert!(recorder.errors().is_empty());
}

#[tokio::test]
async fn test_success_follows_success_branch_only() {
    let (model, _, on_success, on_error) = branching_graph("route");
    let adapter = Arc::new(ScriptedAdapter::default().respond("route", Ok(ActionResult::ok(1.0))));
    let recorder = Recorder::default();

    Engine::new(adapter)
        .run(&model.snapshot(), RunOptions::default(), &recorder.callbacks())
        .await
        .unwrap();

    let started = recorder.started();
    assert!(started.contains(&on_success));
    assert!(!started.contains(&on_error));
}

#[tokio::test]
async fn test_adapter_error_counts_as_failed_result() {
    let (model, router, _, on_error) = branching_graph("route");
    let adapter = Arc::new(
        ScriptedAdapter::default().respond("route", Err(ActionError::Failed("down".to_string()))),
    );

    let report = Engine::new(adapter)
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();

    match report.context.result(router) {
        Some(NodeOutcome::Invoked(result)) => {
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("Action failed: down"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(report.context.result(on_error).is_some());
}

#[tokio::test]
async fn test_failure_without_branches_aborts_run() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let fail = model.add_node(NodeKind::action(action("fail", &[]))).unwrap();
    let after = model.add_node(NodeKind::action(action("after", &[]))).unwrap();
    then(&mut model, begin, PinRole::Next, fail);
    then(&mut model, fail, PinRole::Next, after);

    let adapter = Arc::new(
        ScriptedAdapter::default().respond("fail", Ok(ActionResult::failure("boom"))),
    );
    let recorder = Recorder::default();
    let mut context = ExecutionContext::new();

    let err = Engine::new(adapter.clone())
        .run_in(
            &model.snapshot(),
            RunOptions::default(),
            &recorder.callbacks(),
            &mut context,
        )
        .await
        .unwrap_err();

    match err {
        ExecutionError::ActionInvocationFailure { node, message } => {
            assert_eq!(node, fail);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(recorder.errors(), vec![Some(fail)]);
    assert_eq!(recorder.completed(), 0);
    assert_eq!(recorder.started(), vec![begin, fail]);
    assert!(context.result(fail).is_some());
    assert!(context.result(after).is_none());
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn test_runs_over_one_snapshot_are_isolated() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let show = model.add_node(NodeKind::action(action("show", &[("n", DataType::Number)]))).unwrap();
    let five = model.add_node(NodeKind::literal(DataType::Number, 5.0)).unwrap();
    then(&mut model, begin, PinRole::Next, show);
    feed(&mut model, five, show, "n");

    let snapshot = model.snapshot();
    let engine = Engine::new(Arc::new(ScriptedAdapter::default()));
    let (first, second) = tokio::join!(
        engine.run(&snapshot, RunOptions::default(), &NoopObserver),
        engine.run(&snapshot, RunOptions::default(), &NoopObserver),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.run_id, second.run_id);
    for report in [&first, &second] {
        assert!(report.context.is_evaluated(five));
        let evaluations = report.context.trace().iter().filter(|n| **n == five).count();
        assert_eq!(evaluations, 1);
    }
}

#[tokio::test]
async fn test_pulled_literal_evaluated_once_for_several_consumers() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let first = model.add_node(NodeKind::action(action("first", &[("n", DataType::Number)]))).unwrap();
    let second = model.add_node(NodeKind::action(action("second", &[("n", DataType::Number)]))).unwrap();
    let shared = model.add_node(NodeKind::literal(DataType::Number, 2.0)).unwrap();
    then(&mut model, begin, PinRole::Next, first);
    then(&mut model, first, PinRole::Next, second);
    feed(&mut model, shared, first, "n");
    feed(&mut model, shared, second, "n");

    let adapter = Arc::new(ScriptedAdapter::default());
    let recorder = Recorder::default();
    Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &recorder.callbacks())
        .await
        .unwrap();

    let shared_starts = recorder.started().iter().filter(|n| **n == shared).count();
    assert_eq!(shared_starts, 1);
    for (_, params) in adapter.calls() {
        assert_eq!(params, parameters(&[("n", Value::Number(2.0))]));
    }
}

#[tokio::test]
async fn test_pulled_nodes_can_be_left_unobserved() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let show = model.add_node(NodeKind::action(action("show", &[("n", DataType::Number)]))).unwrap();
    let five = model.add_node(NodeKind::literal(DataType::Number, 5.0)).unwrap();
    then(&mut model, begin, PinRole::Next, show);
    feed(&mut model, five, show, "n");

    let recorder = Recorder::default();
    Engine::new(Arc::new(ScriptedAdapter::default()))
        .observe_pulled_nodes(false)
        .run(&model.snapshot(), RunOptions::default(), &recorder.callbacks())
        .await
        .unwrap();

    assert_eq!(recorder.started(), vec![begin, show]);
}

#[tokio::test]
async fn test_siblings_walked_depth_first_in_edge_order() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let a = model.add_node(NodeKind::action(action("a", &[]))).unwrap();
    let b = model.add_node(NodeKind::action(action("b", &[]))).unwrap();
    let c = model.add_node(NodeKind::action(action("c", &[]))).unwrap();
    then(&mut model, begin, PinRole::Next, a);
    then(&mut model, begin, PinRole::Next, b);
    then(&mut model, a, PinRole::Next, c);

    let report = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(report.context.trace(), &[begin, a, c, b]);
}

#[tokio::test]
async fn test_cancellation_routes_to_error_branch() {
    let (model, router, on_success, on_error) = branching_graph("hang");
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let report = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(
            &model.snapshot(),
            RunOptions::new().with_cancellation(token),
            &NoopObserver,
        )
        .await
        .unwrap();

    match report.context.result(router) {
        Some(NodeOutcome::Invoked(result)) => {
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("Cancelled"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(report.context.result(on_error).is_some());
    assert!(report.context.result(on_success).is_none());
}

#[tokio::test]
async fn test_no_start_node() {
    let mut model = GraphModel::new();
    let five = model.add_node(NodeKind::literal(DataType::Number, 5.0)).unwrap();
    let recorder = Recorder::default();

    let err = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(&model.snapshot(), RunOptions::default(), &recorder.callbacks())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::NoStartNode));
    assert_eq!(recorder.errors(), vec![None]);

    // a pull-only node is not a valid start hint either
    let err = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(&model.snapshot(), RunOptions::new().starting_at(five), &NoopObserver)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::NoStartNode));
}

#[tokio::test]
async fn test_start_without_begin_node() {
    let mut model = GraphModel::new();
    let second = model.add_node(NodeKind::action(action("second", &[]))).unwrap();
    let first = model.add_node(NodeKind::action(action("first", &[]))).unwrap();
    then(&mut model, first, PinRole::Next, second);

    let report = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(report.context.trace(), &[first, second]);

    let report = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(&model.snapshot(), RunOptions::new().starting_at(second), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(report.context.trace(), &[second]);
}

#[tokio::test]
async fn test_unresolved_inputs_fall_back_to_defaults() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let mut config = action("use", &[("a", DataType::Number)]);
    config
        .parameters
        .push(ParameterSpec::new("b", DataType::Number).with_default(7.0));
    config.parameters.push(ParameterSpec::new("c", DataType::Number));
    let consumer = model.add_node(NodeKind::action(config)).unwrap();
    let never_run = model.add_node(NodeKind::action(
        action("never", &[]).with_result_type(DataType::Number),
    )).unwrap();
    then(&mut model, begin, PinRole::Next, consumer);
    model
        .connect(never_run, &pin(never_run, PinRole::Result), consumer, &param(consumer, "c"))
        .unwrap();

    let adapter = Arc::new(ScriptedAdapter::default());
    let report = Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(
        adapter.calls()[0].1,
        parameters(&[
            ("a", Value::Number(0.0)),
            ("b", Value::Number(7.0)),
            ("c", Value::Number(0.0)),
        ])
    );
    let reasons: Vec<_> = report
        .context
        .soft_failures()
        .iter()
        .map(|f| (f.pin_id.clone(), f.reason.clone()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (param(consumer, "a"), SoftFailureReason::Unconnected),
            (
                param(consumer, "c"),
                SoftFailureReason::NotYetProduced {
                    producer: never_run
                }
            ),
        ]
    );
}

#[tokio::test]
async fn test_unresolved_required_parameters_are_reported() {
    init_tracing();
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let mut config = action("parse", &[]);
    config
        .parameters
        .push(ParameterSpec::new("text", DataType::String).required());
    config
        .parameters
        .push(ParameterSpec::new("indent", DataType::Number).required().with_default(2.0));
    config
        .parameters
        .push(ParameterSpec::new("source", DataType::String).required());
    let consumer = model.add_node(NodeKind::action(config)).unwrap();
    let never_run = model.add_node(NodeKind::action(
        action("never", &[]).with_result_type(DataType::String),
    )).unwrap();
    then(&mut model, begin, PinRole::Next, consumer);
    model
        .connect(never_run, &pin(never_run, PinRole::Result), consumer, &param(consumer, "source"))
        .unwrap();

    let observer = SoftFailures::default();
    let adapter = Arc::new(ScriptedAdapter::default());
    let report = Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &observer)
        .await
        .unwrap();

    let expected = vec![
        SoftFailureReason::RequiredUnresolved { producer: None },
        SoftFailureReason::RequiredUnresolved {
            producer: Some(never_run),
        },
    ];
    let reasons: Vec<_> = report
        .context
        .soft_failures()
        .iter()
        .map(|f| f.reason.clone())
        .collect();
    assert_eq!(reasons, expected);
    assert_eq!(*observer.0.lock().unwrap(), expected);
    assert_eq!(
        adapter.calls()[0].1,
        parameters(&[
            ("text", Value::from("")),
            ("indent", Value::Number(2.0)),
            ("source", Value::from("")),
        ])
    );
}

#[tokio::test]
async fn test_result_fields_feed_downstream_inputs() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let fetch = model.add_node(NodeKind::action(
        action("fetch", &[]).with_output("user.name", DataType::String),
    )).unwrap();
    let greet = model.add_node(NodeKind::action(action("greet", &[("name", DataType::String)]))).unwrap();
    then(&mut model, begin, PinRole::Next, fetch);
    then(&mut model, fetch, PinRole::Next, greet);
    model
        .connect(
            fetch,
            &pin(fetch, PinRole::Field("user.name".to_string())),
            greet,
            &param(greet, "name"),
        )
        .unwrap();

    let data = Value::from(serde_json::json!({"user": {"name": "ada"}}));
    let adapter = Arc::new(ScriptedAdapter::default().respond("fetch", Ok(ActionResult::ok(data))));
    Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(
        adapter.calls()[1].1,
        parameters(&[("name", Value::from("ada"))])
    );
}

#[tokio::test]
async fn test_mistyped_literal_aborts_run() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let show = model.add_node(NodeKind::action(action("show", &[("n", DataType::Number)]))).unwrap();
    let bad = model.add_node(NodeKind::literal(DataType::Number, "x")).unwrap();
    then(&mut model, begin, PinRole::Next, show);
    feed(&mut model, bad, show, "n");

    let adapter = Arc::new(ScriptedAdapter::default());
    let err = Engine::new(adapter.clone())
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap_err();

    match err {
        ExecutionError::UnhandledEffect { node, error } => {
            assert_eq!(node, bad);
            assert!(matches!(error, NodeError::InvalidLiteral { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn test_unbound_action_is_an_effect_error() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let unbound = model.add_node(NodeKind::action(ActionConfig::new("", ""))).unwrap();
    then(&mut model, begin, PinRole::Next, unbound);

    let err = Engine::new(Arc::new(ScriptedAdapter::default()))
        .run(&model.snapshot(), RunOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert_eq!(err.node_id(), Some(unbound));
    assert!(matches!(
        err,
        ExecutionError::UnhandledEffect {
            error: NodeError::Configuration(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_runtime_publishes_events() {
    let mut model = GraphModel::new();
    let begin = model.add_node(NodeKind::Begin).unwrap();
    let show = model.add_node(NodeKind::action(action("show", &[("n", DataType::Number)]))).unwrap();
    then(&mut model, begin, PinRole::Next, show);

    let runtime = FlowRuntime::new(Arc::new(ScriptedAdapter::default()));
    let mut events = runtime.subscribe_events();
    let report = runtime
        .run(&model.snapshot(), RunOptions::default())
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.run_id(), report.run_id);
        received.push(event);
    }

    assert!(matches!(
        received.first(),
        Some(ExecutionEvent::RunStarted { start_node, .. }) if *start_node == begin
    ));
    assert!(matches!(
        received.last(),
        Some(ExecutionEvent::RunCompleted { success: true, .. })
    ));
    assert!(received.iter().any(|e| matches!(
        e,
        ExecutionEvent::SoftResolution { node_id, .. } if *node_id == show
    )));
    let completed = received
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::NodeCompleted { .. }))
        .count();
    assert_eq!(completed, 2);
}

#[tokio::test]
async fn test_registered_graph_runs_from_snapshot() {
    let mut model = GraphModel::new();
    model.add_node(NodeKind::Begin).unwrap();

    let runtime = FlowRuntime::new(Arc::new(ScriptedAdapter::default()));
    let id = runtime.register_graph(model).await;

    let report = runtime
        .run_registered(id, RunOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.context.trace().len(), 1);
    assert!(runtime
        .run_registered(uuid::Uuid::new_v4(), RunOptions::default())
        .await
        .unwrap()
        .is_none());
}
