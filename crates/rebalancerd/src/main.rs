//! rebalancerd — the rebalancer daemon.
//!
//! Single binary that assembles:
//! - State store (redb)
//! - Strategy registries (target tracking, Prometheus, Route53)
//! - Controller workers
//! - REST API + `/metrics`
//!
//! # Usage
//!
//! ```text
//! rebalancerd run --config /etc/rebalancer/rebalancer.toml --port 8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use rebalancer_controller::ControllerSettings;
use rebalancer_state::StateStore;

#[derive(Parser)]
#[command(name = "rebalancerd", about = "Rebalancer daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller and API server.
    Run {
        /// Path to rebalancer.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state (overrides `store.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Parallel reconcile workers (overrides `controller.workers`).
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,rebalancerd=debug,rebalancer=debug")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            port,
            data_dir,
            workers,
        } => run(config, port, data_dir, workers).await,
    }
}

async fn run(
    config: Option<PathBuf>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    info!("rebalancer daemon starting");

    let mut config = rebalancerd::load_config(config.as_deref())?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.store.data_dir = data_dir;
    }
    if let Some(workers) = workers {
        anyhow::ensure!(workers > 0, "--workers must be at least 1");
        config.controller.workers = workers;
    }

    // ── State store ────────────────────────────────────────────

    std::fs::create_dir_all(&config.store.data_dir)?;
    let db_path = config.store.data_dir.join("rebalancer.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // ── Controller + API ───────────────────────────────────────

    let settings = ControllerSettings::from_config(&config.controller)?;
    let daemon = rebalancerd::assemble(store, settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller_handle = tokio::spawn(daemon.controller.run(shutdown_rx));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, daemon.router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Let in-flight passes finish.
    if let Err(e) = controller_handle.await {
        error!(error = %e, "controller task failed");
    }

    info!("rebalancer daemon stopped");
    Ok(())
}
