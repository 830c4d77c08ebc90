//! ==============================================================================
//! lib.rs - air quality dashboard host
//! ==============================================================================
//!
//! purpose:
//!     polls a sensor backend for its latest readings every two seconds and
//!     keeps a live dashboard of them: a summary of the newest reading plus
//!     two line charts (temperature/humidity and eco2), served over http.
//!
//! architecture:
//!
//! ```text
//!     ┌──────────────┐  Batch   ┌──────────────┐  apply   ┌──────────────┐
//!     │ poller       │ ───────> │ render loop  │ ───────> │ dashboard    │
//!     │ (2s cycle)   │  mpsc    │ render()     │  write   │ summary +    │
//!     └──────┬───────┘          └──────────────┘          │ 2 charts     │
//!            │ GET /api/readings                          └──────┬───────┘
//!            ▼                                                   │ read
//!     ┌──────────────┐                                    ┌──────┴───────┐
//!     │ backend      │                                    │ web server   │
//!     └──────────────┘                                    └──────────────┘
//! ```
//!
//! ==============================================================================

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod poller;
pub mod reading;
pub mod render;
pub mod server;
pub mod source;

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use config::DashboardConfig;
use dashboard::SharedDashboard;
use poller::{Batch, Poller};
use render::{LabelZone, Labeler};
use source::HttpSource;

impl From<&config::DisplayConfig> for Labeler {
    fn from(display: &config::DisplayConfig) -> Self {
        let zone = if display.utc_labels { LabelZone::Utc } else { LabelZone::Local };
        Labeler::new(display.time_format.clone(), zone)
    }
}

/// drain batches into the dashboard until the poller hangs up
pub async fn render_loop(mut rx: mpsc::Receiver<Batch>, dashboard: SharedDashboard, labeler: Labeler) {
    while let Some(Batch { cycle, readings }) = rx.recv().await {
        let Some(frame) = render::render(&readings, &labeler) else {
            continue;
        };
        let mut guard = dashboard.write().await;
        match guard.apply(cycle, frame) {
            Ok(true) => tracing::debug!(cycle, points = readings.len(), "[RENDER] frame applied"),
            Ok(false) => {}
            Err(e) => tracing::error!(cycle, "[RENDER] failed to apply frame: {e:#}"),
        }
    }
}

/// run poller, render loop and web server until shutdown fires
pub async fn run(config: DashboardConfig, shutdown: watch::Receiver<bool>) -> Result<()> {
    let dashboard = dashboard::Dashboard::shared();
    let source = HttpSource::new(&config.source.url, config.source.timeout())?;
    tracing::info!("[POLL] Reading from {}", source.url());

    let server_state = server::ServerState {
        dashboard: dashboard.clone(),
        refresh_secs: config.polling.interval().as_secs().max(1),
    };
    let mut server = tokio::spawn(server::run_server(config.server.bind, server_state));

    let (tx, rx) = mpsc::channel(4);
    let poller = Poller::new(source, config.polling.interval(), tx).show_readings(config.logging.show_readings);
    let renderer = tokio::spawn(render_loop(rx, dashboard, Labeler::from(&config.display)));

    tokio::select! {
        _ = poller.run(shutdown) => {}
        result = &mut server => {
            // the server only returns on error (e.g. the port is taken)
            result??;
        }
    }
    server.abort();

    // the poller dropped its sender, so this drains and ends
    renderer.await?;
    Ok(())
}
