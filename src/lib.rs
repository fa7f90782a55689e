//! Open-banking gateway
//!
//! Links a user's bank through an open-banking aggregator, persists the
//! linkage and serves per-account summaries derived from transaction feeds.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod security;
pub mod services;
pub mod state;

use api::ApiServer;
use config::Config;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging, load configuration and serve the API until Ctrl+C
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openbanking_gateway=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting open-banking gateway...");

    let config = Config::from_env()?;
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config)?);

    ApiServer::serve(state, addr, shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
