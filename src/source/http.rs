//! HTTP endpoint implementation of [`FeedSource`].

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use super::{FeedPayload, FeedSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The site's live-update endpoint.
///
/// Issues a single `GET` with `Accept: application/json` per fetch.
pub struct HttpFeed {
    /// The endpoint URL to poll.
    pub url: String,
    client: Client,
}

impl HttpFeed {
    /// Create a feed for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl FeedSource for HttpFeed {
    fn name(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<FeedPayload> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Failed to fetch latest headlines: {}", status.as_u16());
        }

        let body = response.text().context("failed to read response body")?;
        FeedPayload::from_json(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
