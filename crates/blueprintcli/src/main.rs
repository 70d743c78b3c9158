use anyhow::{Context, Result};
use blueprintactions::builtin_registry;
use blueprintcore::{
    ActionConfig, DataType, ExecutionEvent, Graph, GraphDocument, GraphModel, NodeId, NodeKind,
    NodeOutcome, PinId, PinRole,
};
use blueprintruntime::{select_start, FlowRuntime, RunOptions};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blueprint")]
#[command(about = "Blueprint graph runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a graph file
    Run {
        /// Path to graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Node id to start from instead of the Begin node
        #[arg(short, long)]
        start: Option<u64>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a graph file
    Validate {
        /// Path to graph JSON file
        file: PathBuf,
    },

    /// List available actions
    Actions,

    /// Create an example graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Commands::Run { file, start, .. } => {
            run_graph(&file, start.map(NodeId)).await?;
        }

        Commands::Validate { file } => {
            validate_graph(&file)?;
        }

        Commands::Actions => {
            list_actions();
        }

        Commands::Init { output } => {
            create_example_graph(&output)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_graph(file: &Path) -> Result<(Option<String>, Graph)> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document: GraphDocument = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    let name = document.name.clone();
    let graph = document.into_graph()?;
    Ok((name, graph))
}

async fn run_graph(file: &Path, start: Option<NodeId>) -> Result<()> {
    println!("🚀 Loading graph from: {}", file.display());

    let (name, graph) = load_graph(file)?;
    println!("📋 Graph: {}", name.as_deref().unwrap_or("(unnamed)"));
    println!("   Nodes: {}", graph.node_count());
    println!("   Edges: {}", graph.edge_count());
    println!();

    let runtime = FlowRuntime::new(Arc::new(builtin_registry()));
    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { start_node, .. } => {
                    println!("▶️  Run started at node {}", start_node);
                }
                ExecutionEvent::NodeStarted { node_id, kind, .. } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, kind.as_str());
                }
                ExecutionEvent::NodeCompleted {
                    node_id, outcome, ..
                } => {
                    if outcome.is_success() {
                        println!("  ✅ Node {} completed", node_id);
                    } else {
                        println!("  ↪️  Node {} failed, taking error branch", node_id);
                    }
                }
                ExecutionEvent::SoftResolution {
                    node_id,
                    pin_id,
                    reason,
                    ..
                } => {
                    println!("     ⚠️  [{}] {} defaulted: {}", node_id, pin_id, reason);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => match node_id {
                    Some(id) => println!("  ❌ Node {} failed: {}", id, error),
                    None => println!("  ❌ Run failed: {}", error),
                },
                ExecutionEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Run completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Run failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut options = RunOptions::new().with_cancellation(cancellation);
    options.start = start;
    let result = runtime.run(&graph, options).await;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    let report = result?;

    println!();
    println!("📊 Run Summary:");
    println!("   Run ID: {}", report.run_id);
    println!("   Executed: {} nodes", report.context.trace().len());
    if !report.context.soft_failures().is_empty() {
        println!("   Defaulted inputs: {}", report.context.soft_failures().len());
    }

    println!();
    println!("📤 Results:");
    for (node_id, outcome) in report.context.results() {
        match outcome {
            NodeOutcome::Began => {}
            NodeOutcome::Published { value } => println!("   Node {}: {}", node_id, value),
            NodeOutcome::Invoked(result) => match (&result.data, &result.error) {
                (_, Some(error)) => println!("   Node {}: error: {}", node_id, error),
                (Some(data), None) => println!("   Node {}: {}", node_id, data),
                (None, None) => println!("   Node {}: ok", node_id),
            },
        }
    }

    Ok(())
}

fn validate_graph(file: &Path) -> Result<()> {
    println!("🔍 Validating graph: {}", file.display());

    let (name, graph) = load_graph(file)?;
    let registry = builtin_registry();

    println!("✅ Graph is valid:");
    println!("   Name: {}", name.as_deref().unwrap_or("(unnamed)"));
    println!("   Nodes: {}", graph.node_count());
    println!("   Edges: {}", graph.edge_count());

    match select_start(&graph, None) {
        Ok(start) => println!("   Start: node {}", start),
        Err(e) => println!("   ⚠️  {}", e),
    }

    for node in graph.nodes() {
        if let NodeKind::ActionInvocation(config) = &node.kind {
            if registry.get(&config.component_id, &config.action_id).is_none() {
                println!(
                    "   ⚠️  Node {} uses unknown action {}.{}",
                    node.id, config.component_id, config.action_id
                );
            }
        }
    }

    Ok(())
}

fn list_actions() {
    println!("📦 Available Actions:");
    println!();

    for descriptor in builtin_registry().descriptors() {
        println!(
            "  • {}.{} -> {}",
            descriptor.component_id, descriptor.action_id, descriptor.result_type
        );
        println!("    {}", descriptor.description);
        for param in &descriptor.parameters {
            match &param.default {
                Some(default) => println!(
                    "      {}: {} = {}",
                    param.name,
                    param.data_type,
                    default.to_json_string()
                ),
                None => println!("      {}: {}", param.name, param.data_type),
            }
        }
    }
}

fn create_example_graph(output: &Path) -> Result<()> {
    let registry = builtin_registry();
    let sum = registry
        .descriptor("math", "sum")
        .context("math.sum is not registered")?;

    let mut model = GraphModel::new();
    let begin = model.add_labeled_node(NodeKind::Begin, "Begin")?;
    let a = model.add_labeled_node(NodeKind::literal(DataType::Number, 5.0), "A")?;
    let b = model.add_labeled_node(NodeKind::literal(DataType::String, "3"), "B (text)")?;
    let parse_b = model.add_node(NodeKind::converter(DataType::String, DataType::Number))?;
    let add = model.add_labeled_node(
        NodeKind::action(ActionConfig::from_descriptor(&sum)),
        "Add",
    )?;
    let format = model.add_node(NodeKind::converter(DataType::Number, DataType::String))?;
    let log = model.add_labeled_node(
        NodeKind::action(ActionConfig::new("debug", "log").with_parameter("message", DataType::String)),
        "Log Sum",
    )?;

    let pin = |node: NodeId, role: PinRole| PinId::new(node, &role);
    let param = |node: NodeId, name: &str| PinId::new(node, &PinRole::Parameter(name.to_string()));

    model.connect(begin, &pin(begin, PinRole::Next), add, &pin(add, PinRole::ExecIn))?;
    model.connect(add, &pin(add, PinRole::Next), log, &pin(log, PinRole::ExecIn))?;
    model.connect(a, &pin(a, PinRole::Output), add, &param(add, "a"))?;
    model.connect(b, &pin(b, PinRole::Output), parse_b, &pin(parse_b, PinRole::Input))?;
    model.connect(parse_b, &pin(parse_b, PinRole::Output), add, &param(add, "b"))?;
    model.connect(add, &pin(add, PinRole::Result), format, &pin(format, PinRole::Input))?;
    model.connect(format, &pin(format, PinRole::Output), log, &param(log, "message"))?;

    let mut document = model.graph().to_document();
    document.name = Some("Example Sum Graph".to_string());

    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(output, json)?;

    println!("✨ Created example graph: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  blueprint run --file {}", output.display());

    Ok(())
}
