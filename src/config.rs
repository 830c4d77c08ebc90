//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - SourceConfig: Where readings come from and how long a fetch may take.
//!     - PollingConfig: How often the backend is polled.
//!     - ServerConfig: Address the dashboard is served on.
//!     - DisplayConfig: How chart labels are formatted.
//!     - LoggingConfig: Log level and whether each batch is echoed.
//!
//! ==============================================================================

use crate::render::{DEFAULT_TIME_FORMAT, is_valid_time_format};

use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    /// full url of the readings endpoint
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// strftime pattern for chart labels
    pub time_format: String,
    /// label in utc instead of the host's local zone
    pub utc_labels: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_readings: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000/api/readings".to_string(),
            timeout_ms: 1500,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: SocketAddr::from(([0, 0, 0, 0], 8080)) }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { time_format: DEFAULT_TIME_FORMAT.to_string(), utc_labels: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_readings: false }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DashboardConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    /// Parse and validate a toml document
    pub fn parse(content: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(content)
            .map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.polling.interval_ms > 0, "polling.interval_ms must be greater than zero");
        ensure!(self.source.timeout_ms > 0, "source.timeout_ms must be greater than zero");
        reqwest::Url::parse(&self.source.url)
            .with_context(|| format!("source.url is not a valid url: {}", self.source.url))?;
        ensure!(
            is_valid_time_format(&self.display.time_format),
            "display.time_format is not a valid strftime pattern: {:?}",
            self.display.time_format
        );
        Ok(())
    }

    /// First config file found in the usual places
    pub fn locate() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config").join("dashboard.toml"),
            PathBuf::from("..").join("config").join("dashboard.toml"),
        ];
        paths.into_iter().find(|p| p.exists())
    }

    /// Load with default fallback
    ///
    /// a file that exists but fails to parse is an error, a missing file is not.
    pub fn load_or_default() -> Result<(Self, Option<PathBuf>)> {
        match Self::locate() {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            source = %self.source.url,
            interval_ms = self.polling.interval_ms,
            timeout_ms = self.source.timeout_ms,
            bind = %self.server.bind,
            level = %self.logging.level,
            "configuration"
        );
    }
}
