//! civic-mirror server entry point.
//!
//! Boots the HTTP server in front of the snapshot, redirect and bill detail
//! caches. Logs are JSON on stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use civic_client::{LegistarClient, object_source};
use civic_core::{AppConfig, CacheService};

mod error;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        bucket = %config.bucket,
        dev_mode = config.dev_mode,
        dev_file_path = ?config.dev_file_path,
        "starting civic-mirror"
    );

    let objects = object_source(&config).context("building object source")?;
    let records = Arc::new(LegistarClient::from_app(&config).context("building Legistar client")?);
    let cache = Arc::new(CacheService::from_config(&config, objects, records));

    let app = routes::build_router(routes::AppState::new(cache, &config), config.log_requests);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
