//! ==============================================================================
//! dashboard.rs - display state shared between render loop and web server
//! ==============================================================================
//!
//! purpose:
//!     holds the summary line and the two chart widgets. the render loop is the
//!     only writer; the web server only reads.
//!
//! update rules:
//!     - every applied frame fully replaces labels and data on both charts
//!     - a frame from an older (or the same) poll cycle is ignored, so stale
//!       data can never overwrite fresher data
//!     - nothing here changes when a cycle fails or returns no readings,
//!       because no frame is produced for those
//!
//! relationships:
//!     - written by: lib.rs render loop (apply)
//!     - read by: server.rs (page, json snapshot)
//!     - uses: chart.rs, render.rs
//!
//! ==============================================================================

use crate::chart::{ChartWidget, LineChart, escape};
use crate::render::Frame;

use anyhow::{Result, ensure};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedDashboard = Arc<RwLock<Dashboard>>;

#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    /// latest-reading line, None until the first successful cycle
    pub summary: Option<String>,
    pub temperature_chart: LineChart,
    pub eco2_chart: LineChart,
    /// poll cycle the current frame came from
    pub last_cycle: Option<u64>,
    /// unix timestamp (ms) of last successful update
    pub last_update: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            summary: None,
            temperature_chart: LineChart::climate(),
            eco2_chart: LineChart::eco2(),
            last_cycle: None,
            last_update: 0,
        }
    }
}

impl Dashboard {
    pub fn shared() -> SharedDashboard {
        Arc::new(RwLock::new(Self::default()))
    }

    /// put a frame on screen; returns false if it was older than what is shown
    pub fn apply(&mut self, cycle: u64, frame: Frame) -> Result<bool> {
        if self.last_cycle.is_some_and(|last| cycle <= last) {
            tracing::debug!(cycle, last = ?self.last_cycle, "dropping stale frame");
            return Ok(false);
        }

        // check both widgets up front so a bad one leaves nothing half-updated
        ensure!(
            self.temperature_chart.datasets.len() >= 2 && !self.eco2_chart.datasets.is_empty(),
            "chart widgets are missing datasets"
        );

        let Frame { summary, labels, temperature, humidity, eco2 } = frame;

        self.temperature_chart.set_labels(labels.clone());
        self.temperature_chart.set_data(0, temperature)?;
        self.temperature_chart.set_data(1, humidity)?;
        self.temperature_chart.redraw();

        self.eco2_chart.set_labels(labels);
        self.eco2_chart.set_data(0, eco2)?;
        self.eco2_chart.redraw();

        self.summary = Some(summary.text());
        self.last_cycle = Some(cycle);
        self.last_update = now_ms();
        Ok(true)
    }

    /// full html document for the browser
    pub fn page(&self, refresh_secs: u64) -> String {
        let summary = match &self.summary {
            Some(s) => escape(s),
            None => "waiting for readings...".to_string(),
        };
        format!(
            r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh_secs}">
<title>Air Quality</title>
<style>
body {{ font-family: system-ui; padding: 2rem; background: #1a1a2e; color: #eee; }}
#latest-readings {{ font-size: 1.2rem; margin-bottom: 1.5rem; }}
.chart {{ width: 100%; max-width: 720px; background: #16213e; border-radius: 8px; margin-bottom: 1rem; }}
.chart text {{ fill: #ccc; }}
</style>
</head>
<body>
<h1>Air Quality</h1>
<div id="latest-readings">{summary}</div>
<div id="temp-chart">{}</div>
<div id="eco2-chart">{}</div>
</body>
</html>"#,
            self.temperature_chart.svg(),
            self.eco2_chart.svg(),
        )
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
