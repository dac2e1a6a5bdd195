//! cutoverd — the cutover daemon.
//!
//! Serves the join endpoint, writes routing documents for the file-provider
//! proxy and runs the delayed teardown of superseded replicas.
//!
//! # Usage
//!
//! ```text
//! cutoverd --config /etc/cutoverd.toml --port 10234
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cutover_rollout::JoinController;
use cutover_runtime::{ContainerRuntime, DockerRuntime, MemoryRuntime};
use cutover_topology::TopologyStore;

use crate::config::{DaemonConfig, LogFormat, RuntimeKind};

const DEFAULT_FILTER: &str = "info,cutoverd=debug,cutover=debug";

#[derive(Parser)]
#[command(name = "cutoverd", about = "Weighted replica cutover daemon")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on. Overrides the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    init_tracing(config.log_format);
    run(config).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

fn build_runtime(config: &DaemonConfig) -> Arc<dyn ContainerRuntime> {
    match config.runtime {
        RuntimeKind::Docker => Arc::new(
            DockerRuntime::new(&config.docker_socket, &config.network)
                .with_timeout(config.docker_timeout()),
        ),
        RuntimeKind::Memory => Arc::new(MemoryRuntime::new()),
    }
}

/// Assemble the controller and its router.
fn build_app(config: &DaemonConfig) -> anyhow::Result<(JoinController, Router)> {
    let controller = JoinController::new(
        build_runtime(config),
        TopologyStore::new(&config.config_dir),
        config.join_config()?,
    );
    let router = cutover_api::build_router(controller.clone());
    Ok((controller, router))
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!(
        config_dir = %config.config_dir.display(),
        runtime = ?config.runtime,
        network = %config.network,
        default_delay_minutes = config.default_delay_minutes,
        "cutover daemon starting"
    );

    std::fs::create_dir_all(&config.config_dir)?;
    let (controller, router) = build_app(&config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    let aborted = controller.drains().shutdown();
    if aborted > 0 {
        warn!(aborted, "pending drains abandoned at shutdown");
    }

    info!("cutover daemon stopped");
    Ok(())
}
