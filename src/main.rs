//! Widget Cache - dashboard widget API server
//!
//! Serves widget payloads from PostgreSQL through a shared read-through cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use widget_cache::api::create_router;
use widget_cache::backend::PgBackend;
use widget_cache::{spawn_cleanup_task, AppState, Config, DataService};

/// Main entry point for the widget API server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Configure the (lazily connected) database pool and data service
/// 4. Start cache warmup and the background TTL cleanup task
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "widget_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting widget API server");

    let config = Config::from_env();
    info!(
        max_entries = config.cache.max_entries,
        default_ttl_ms = config.cache.default_ttl.as_millis() as u64,
        port = config.server_port,
        "configuration loaded"
    );

    let backend = PgBackend::connect_lazy(&config.database).context("invalid DATABASE_URL")?;
    let service = Arc::new(DataService::new(Arc::new(backend), &config));

    if config.warmup.enabled {
        let warmup = Arc::clone(&service);
        tokio::spawn(async move {
            warmup.warmup().await;
        });
    }

    let cleanup_handle = spawn_cleanup_task(Arc::clone(service.cache()), config.cache.cleanup_interval);
    info!("Background cleanup task started");

    let app = create_router(AppState::new(Arc::clone(&service)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    service.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to install SIGTERM handler");
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

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
