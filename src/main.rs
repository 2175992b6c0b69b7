//! # Product Cache API - Main Entry Point
//!
//! Boots the product API with its read-through response cache:
//! configuration → logging → metrics → cache backend → repository → HTTP server.
//!
//! A Redis outage at startup is not fatal. The service starts with the cache bypassed and
//! the connection supervisor brings caching back once Redis is reachable.

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use product_cache_api::caching::stores::build_store;
use product_cache_api::core::config::AppConfig;
use product_cache_api::core::error::AppResult;
use product_cache_api::gateway::{AppServer, AppState};
use product_cache_api::observability::{logging, metrics};
use product_cache_api::products::InMemoryProductRepository;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be up yet
        eprintln!("Failed to start product cache API: {}", e);
        error!("Failed to start product cache API: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let config = AppConfig::load().await?;
    logging::init(&config.observability.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting product cache API"
    );

    let store = build_store(&config.cache).await?;
    if !store.is_available() && config.cache.enabled {
        warn!(backend = store.name(), "Cache backend not reachable yet, serving uncached");
    }

    let repo = Arc::new(InMemoryProductRepository::new());
    let mut state = AppState::new(&config, store, repo);

    if config.observability.metrics.enabled {
        let handle = metrics::install_recorder()?;
        state = state.with_metrics(handle);
        info!(
            path = %config.observability.metrics.endpoint_path,
            "Prometheus metrics enabled"
        );
    }

    AppServer::new(state).run(shutdown_signal()).await?;

    info!("Product cache API shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
