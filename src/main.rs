use clap::Parser;
use std::path::PathBuf;
use tick_ring::{
    config::Config,
    ring::{executor_fn, init_ring_metrics, ticker, ExecutionOutcome, Ring, TaskRef},
    telemetry,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tick-ring")]
#[command(about = "Run a timer-wheel scheduler with a few demo tasks", long_about = None)]
struct Cli {
    /// Configuration file overriding the built-in defaults
    #[arg(short, long, env = "TICK_RING_CONFIG")]
    config: Option<PathBuf>,

    /// Number of demo tasks to register
    #[arg(short, long, default_value = "8")]
    tasks: u64,

    /// Demo tasks are spread over this many ticks
    #[arg(short, long, default_value = "10")]
    spread: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DemoKind {
    Heartbeat,
    Report,
}

type DemoTask = TaskRef<Uuid, DemoKind, String>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    telemetry::init_tracing(&config.observability)?;
    init_ring_metrics();

    tracing::info!("Starting tick-ring v{}", env!("CARGO_PKG_VERSION"));

    let token = CancellationToken::new();
    let ring: Ring<Uuid, DemoKind, String> = Ring::builder(config.ring.clone())
        .executor(
            DemoKind::Heartbeat,
            executor_fn(|tick, tasks: Vec<DemoTask>| async move {
                for task in &tasks {
                    tracing::info!(id = %task.id(), %tick, "heartbeat: {}", task.value());
                }
                ExecutionOutcome::ok()
            }),
        )
        .executor(
            DemoKind::Report,
            executor_fn(|tick, tasks: Vec<DemoTask>| async move {
                tracing::info!(count = tasks.len(), %tick, "report batch");
                ExecutionOutcome::ok()
            }),
        )
        .start(&token, ticker(config.ring.tick_interval()))?;

    let spread = cli.spread.max(1);
    for n in 0..cli.tasks {
        let kind = if n % 2 == 0 {
            DemoKind::Heartbeat
        } else {
            DemoKind::Report
        };
        let when = n % spread + 1;
        ring.register(Uuid::new_v4(), kind, format!("demo task {}", n), when)
            .await?;
    }
    tracing::info!(tasks = cli.tasks, ring = %ring.name(), "Demo tasks registered");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = token.cancelled() => {}
    }

    ring.shutdown().await;
    Ok(())
}
