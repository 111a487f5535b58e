//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building the shared HTTP client
//! - Rotating the user agent on every attempt
//! - Retrying through `run_with_retry`, with HTTP 403 as its own class
//! - Degrading to an empty result instead of an error

use crate::config::FetchConfig;
use crate::crawler::retry::{run_with_retry, Attempt, RetryPolicy, RetryReport};
use crate::identity::IdentityPool;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("failed to read body: {0}")]
    Body(String),
}

/// Result of fetching one URL
#[derive(Debug)]
pub struct FetchOutcome {
    /// Page body, `None` once every retry was used up
    pub body: Option<String>,
    pub report: RetryReport,
}

impl FetchOutcome {
    /// Body text, empty when the fetch gave up
    pub fn into_text(self) -> String {
        self.body.unwrap_or_default()
    }
}

/// Builds an HTTP client with proper configuration
///
/// No default user agent is set; every request picks one from the
/// identity pool.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrying, identity-rotating page fetcher
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    identities: IdentityPool,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, identities: IdentityPool, policy: RetryPolicy) -> Self {
        Self {
            client,
            identities,
            policy,
        }
    }

    /// Builds the client from configuration
    ///
    /// # Returns
    ///
    /// * `Err(reqwest::Error)` - The HTTP client could not be initialized
    pub fn from_config(
        config: &FetchConfig,
        identities: IdentityPool,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::new(client, identities, RetryPolicy::from_config(config)))
    }

    /// Fetches a URL, retrying per the policy
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | HTTP 403 | Long cooldown, retry outside the normal budget |
    /// | Other status | Standard delay, counts against `max_retries` |
    /// | Transport / body error | Standard delay, counts against `max_retries` |
    ///
    /// Never fails: an exhausted budget yields `body: None`.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let (body, report) =
            run_with_retry(&self.policy, url, |attempt| self.attempt(url, attempt)).await;

        tracing::debug!(
            "Fetched {} in {} attempt(s) (success: {})",
            url,
            report.attempts,
            body.is_some()
        );

        FetchOutcome { body, report }
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Attempt<String, FetchError> {
        let agent = self.identities.choose();
        tracing::trace!("GET {} (attempt {}, agent {})", url, attempt, agent);

        let response = match self.client.get(url).header(USER_AGENT, agent).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    "connection refused".to_string()
                } else {
                    e.to_string()
                };
                return Attempt::Failed(FetchError::Transport(error));
            }
        };

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Attempt::Blocked;
        }

        if !status.is_success() {
            return Attempt::Failed(FetchError::Status {
                status: status.as_u16(),
            });
        }

        match response.text().await {
            Ok(body) => Attempt::Success(body),
            Err(e) => Attempt::Failed(FetchError::Body(e.to_string())),
        }
    }
}
