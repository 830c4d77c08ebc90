//! ==============================================================================
//! source.rs - backend reading source
//! ==============================================================================
//!
//! purpose:
//!     pulls the current reading set from the backend collaborator.
//!     the backend answers GET /api/readings with a json array, newest first.
//!     an empty array is valid and means "no data yet".
//!
//! failure model:
//!     transport errors, timeouts, non-2xx statuses and malformed bodies are
//!     all the same failure to the caller. the poller logs it and moves on.
//!
//! relationships:
//!     - used by: poller.rs (one fetch per poll cycle)
//!     - produces: reading.rs (Reading)
//!
//! ==============================================================================

use crate::reading::Reading;

use anyhow::{Context, Result, anyhow};
use std::future::Future;
use std::time::Duration;

/// anything that can hand the poller a newest-first batch of readings
pub trait ReadingSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>>> + Send;
}

/// reads from the backend over http
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(url).with_context(|| format!("invalid source url {url}"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

impl ReadingSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<Reading>> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", self.url, status));
        }

        // read the body first so a decode error can name what went wrong
        let body = response
            .bytes()
            .await
            .with_context(|| format!("reading body of {} failed", self.url))?;
        serde_json::from_slice(&body).context("malformed readings payload")
    }
}
