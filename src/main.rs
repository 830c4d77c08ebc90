//! ==============================================================================
//! main.rs - air quality dashboard entry point
//! ==============================================================================
//!
//! responsibilities:
//!     - load dashboard.toml (or defaults)
//!     - initialize logging (RUST_LOG overrides the configured level)
//!     - run poller, render loop and web server (lib.rs)
//!     - stop cleanly on ctrl+c
//!
//! ==============================================================================

use airwatch::config::DashboardConfig;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let (config, path) = DashboardConfig::load_or_default()?;

    // step 2: logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .with_context(|| format!("invalid log level {:?}", config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &path {
        Some(path) => tracing::info!("[CONFIG] Loaded from {}", path.display()),
        None => tracing::warn!("[CONFIG] No config file found - using defaults"),
    }
    config.log_summary();

    // step 3: shutdown on ctrl+c
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("[RUNTIME] Ctrl+C received, shutting down"),
            Err(e) => tracing::error!("[RUNTIME] Failed to wait for Ctrl+C signal: {e}"),
        }
        let _ = stop_tx.send(true);
    });

    // step 4: run until stopped
    if let Err(e) = airwatch::run(config, stop_rx).await {
        tracing::error!("[RUNTIME] {e:#}");
        return Err(e);
    }
    Ok(())
}
