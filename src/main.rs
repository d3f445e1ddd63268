//! Relay Cache - An offline-first HTTP response cache
//!
//! Serves the upstream origin through `/proxy`, with precaching, per-class
//! strategies and background sync.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_cache::api::{create_router, AppState};
use relay_cache::{
    spawn_cleanup_task, spawn_connectivity_monitor, CacheWorker, Config, WorkerEvents,
};

/// Main entry point for the Relay Cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the worker, install and activate it
/// 4. Start the eviction sweep and the connectivity monitor
/// 5. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Relay Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: namespace={}-{}, upstream={}, port={}, cleanup_interval={}s",
        config.product,
        config.version,
        config.upstream_url,
        config.server_port,
        config.cleanup_interval
    );

    let worker = CacheWorker::from_config(&config)
        .await
        .context("failed to build cache worker")?;

    // A failed install leaves nothing to serve from
    worker
        .on_install()
        .await
        .context("install failed, refusing to start")?;
    let retired = worker.on_activate().await.context("activation failed")?;
    info!("Activated, {} old namespaces retired", retired.len());

    let cleanup_handle = spawn_cleanup_task(
        worker.store().clone(),
        worker.names().clone(),
        config.cleanup_interval,
    );
    let connectivity_handle = spawn_connectivity_monitor(
        worker.fetcher().clone(),
        worker.upstream().clone(),
        worker.sync().clone(),
        config.connectivity_interval,
    );
    info!("Background tasks started");

    let app = create_router(AppState::new(worker));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(vec![cleanup_handle, connectivity_handle]))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in &tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
