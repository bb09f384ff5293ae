//! expensegate server entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use expensegate_server::{AppState, ServerConfig, build_router};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Expense tracker API with token authentication and per-user rate limits
#[derive(Parser, Debug)]
#[command(name = "expensegate", version, about)]
struct Cli {
    /// Configuration file (.toml, .yaml or .json)
    #[arg(long, short = 'c', env = "EXPENSEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the port
    #[arg(long, short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let _log_guard = config
        .logging
        .init()
        .context("Failed to initialize logging")?;

    let state = AppState::from_config(&config).context("Invalid authentication settings")?;
    let eviction = state.limiter.spawn_eviction_task();

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "expensegate listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    eviction.abort();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received, initiating shutdown"),
        () = terminate => info!("SIGTERM received, initiating shutdown"),
    }
}
