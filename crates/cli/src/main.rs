mod presentation;
mod providers;

use clap::Parser;
use launch_core::config;
use launch_core::orchestrator::LaunchOrchestrator;
use launch_core::worker::ProcessChannelFactory;
use launch_protocol::Op;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "launchkit", version, about = "Launch orchestrator for the game client")]
struct Cli {
    /// Directory containing launcher.toml and launcher data.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Distribution entry to launch, overriding the configured selection.
    #[arg(long)]
    entry: Option<String>,

    /// What to do when no compatible runtime is found.
    #[arg(long, value_enum, default_value = "install")]
    runtime: presentation::RuntimePolicy,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = config::load_config(&cli.config_dir)?;
    if let Some(entry) = cli.entry {
        config.selected_entry = Some(entry);
    }
    config.runtime_executable = config::resolve_runtime_executable(&config);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (ops_tx, mut ops_rx) = mpsc::unbounded_channel();

    let distribution = Arc::new(providers::FileDistributionProvider::new(
        &config.data_directory,
    ));
    let accounts = Arc::new(providers::ConfigAccountStore::new(config.account.clone()));
    let builder = Arc::new(providers::CommandGameBuilder::new(
        config.instance_directory.clone(),
    ));

    let renderer = tokio::spawn(presentation::run(events_rx, ops_tx.clone(), cli.runtime));

    // Ctrl-C abandons the attempt instead of tearing the process down.
    let abort_ops = ops_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = abort_ops.send(Op::Abort);
        }
    });

    let mut orchestrator = LaunchOrchestrator::new(
        config,
        distribution,
        accounts,
        builder,
        Arc::new(ProcessChannelFactory),
        events_tx,
    );
    let summary = orchestrator.launch(&mut ops_rx).await?;

    // Dropping the orchestrator closes the event stream; let the renderer
    // drain it before reporting.
    drop(orchestrator);
    drop(ops_tx);
    renderer.await?;

    tracing::info!(
        session = %summary.session_id,
        state = ?summary.state,
        "launch attempt finished"
    );
    Ok(())
}
