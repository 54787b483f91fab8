//! Resilient HTTP fetcher
//!
//! Every call issues a fresh GET. A non-2xx status or a transport failure is
//! retried along a fixed backoff schedule; once the schedule is exhausted the
//! caller gets a [`FetchError`] carrying the URL and the last failure.
//!
//! Certificate validation is disabled by default because the government
//! targets serve incomplete or self-signed chains. Responses are therefore
//! fetched without TLS authentication.

use crate::config::FetcherConfig;
use crate::{FetchError, FetchFailure};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Delays used by the production sources
pub const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(10),
];

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP GET with bounded retry
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    backoff: Vec<Duration>,
}

impl Fetcher {
    /// Creates a fetcher from an existing client and backoff schedule
    ///
    /// The schedule length is the number of attempts. Entry `i` is the pause
    /// before retry `i + 1`; no pause follows the final attempt, so the last
    /// entry is unused. An empty schedule is treated as a single attempt.
    pub fn new(client: Client, backoff: Vec<Duration>) -> Self {
        Self { client, backoff }
    }

    /// Builds the client and schedule described by `config`
    pub fn from_config(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        let backoff = config
            .backoff_schedule_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect();
        Ok(Self::new(client, backoff))
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> usize {
        self.backoff.len().max(1)
    }

    /// Fetches a URL and returns the raw response body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Unparseable URL | Immediate `FetchError::InvalidUrl` |
    /// | 2xx | Return body |
    /// | Any other status | Sleep `backoff[i]`, retry |
    /// | Transport error (timeout, refused, TLS, body read) | Sleep `backoff[i]`, retry |
    /// | Schedule exhausted | `FetchError::Exhausted` with the last failure |
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            let failure = match self.attempt(&parsed).await {
                Ok(body) => {
                    if attempt > 0 {
                        tracing::debug!(url, attempt = attempt + 1, "fetch recovered after retry");
                    }
                    return Ok(body);
                }
                Err(failure) => failure,
            };

            attempt += 1;
            if attempt >= attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts,
                    last: failure,
                });
            }

            let delay = self.backoff[attempt - 1];
            tracing::debug!(
                url,
                attempt,
                error = %failure,
                delay_ms = delay.as_millis() as u64,
                "fetch failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Vec<u8>, FetchFailure> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
