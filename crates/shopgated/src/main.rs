//! shopgated - shopgate gateway daemon
//!
//! The only network-reachable component: answers `/health` itself, probes
//! the backend for `/api/health`, and forwards every other `/api/*` request
//! to the private product backend.
//!
//! Usage:
//!   shopgated [OPTIONS]
//!
//! The backend address and listen port come from flags, the environment
//! (`BACKEND_HOST`, `BACKEND_PORT`, `GATEWAY_PORT`, ...) or a TOML file
//! given with `--config`. See `shopgated --help`.

mod cli;

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use shopgate_api::{create_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let json = cli.log_json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shopgated=info,shopgate_api=info,shopgate_proxy=info,tower_http=info".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting shopgated");

    if let Err(e) = run(cli).await {
        tracing::error!(error = %format!("{:#}", e), "shopgated terminated");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve().context("Invalid configuration")?;
    let listen_addr = config.listen_addr;

    tracing::info!(
        backend = %config.backend_url,
        health_path = %config.backend_health_path,
        proxy_timeout_ms = config.proxy_timeout.as_millis() as u64,
        health_timeout_ms = config.health_timeout.as_millis() as u64,
        "Gateway configured"
    );

    let state = AppState::from_config(config).context("Failed to create backend client")?;
    let app = create_router(state);

    // A port we cannot bind is fatal
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
