//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client (timeouts, decompression, TLS trust mode)
//! - Rotating the client identity on every attempt
//! - Retrying blocked, timed-out and failed requests with backoff
//! - Classifying transport errors

use crate::config::FetchConfig;
use crate::crawler::identity::{IdentityPool, ACCEPT, ACCEPT_LANGUAGE};
use crate::crawler::retry::{RetryPolicy, RetryState};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One successfully retrieved page
///
/// Any status other than 403 is a successful retrieval here: a 404 or 500
/// page is returned as-is and archived like any other.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested
    pub url: Url,
    /// URL the response came from after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Decoded response body
    pub body: String,
    /// Content-Type header, if the server sent one
    pub content_type: Option<String>,
    /// Server header, if the server sent one
    pub server: Option<String>,
    /// When the response was received
    pub fetched_at: DateTime<Utc>,
}

/// Errors raised while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Blocked with HTTP {status} at {url}")]
    Blocked { url: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Gave up on {url} after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns true for failures that are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport { .. } | Self::Blocked { .. }
        )
    }

    /// Returns true if the server refused the request with 403
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Returns the cause of the final attempt for exhausted fetches
    pub fn last_cause(&self) -> &FetchError {
        match self {
            Self::Exhausted { source, .. } => source.last_cause(),
            other => other,
        }
    }

    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Builds the HTTP client used for every fetch of a run
///
/// Certificate validation is disabled: archived sites frequently present
/// expired or incomplete chains. Callers are expected to announce this.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with retry, backoff and identity rotation
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    identities: IdentityPool,
}

impl Fetcher {
    /// Creates a fetcher with an explicit timeout, retry policy and identity pool
    pub fn new(
        timeout: Duration,
        retry: RetryPolicy,
        identities: IdentityPool,
    ) -> Result<Self, FetchError> {
        let client = build_http_client(timeout).map_err(FetchError::Client)?;
        Ok(Self {
            client,
            retry,
            identities,
        })
    }

    /// Creates a fetcher from the `[fetch]` configuration section
    ///
    /// Delays that do not fit a `Duration` are rejected as
    /// `HarvestError::Config`.
    pub fn from_config(config: &FetchConfig) -> Result<Self, HarvestError> {
        let fetcher = Self::new(
            config.timeout(),
            RetryPolicy::from_config(config)?,
            IdentityPool::new(config.user_agents.clone()),
        )?;
        Ok(fetcher)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 403 | Retry, backoff plus jitter |
    /// | Timeout | Retry, backoff |
    /// | Transport error | Retry, backoff |
    /// | Any other status | Returned as-is |
    ///
    /// Retry `n` waits `base_delay * 2^(n-1)`. Once `max_retries` retries
    /// have failed the call returns `FetchError::Exhausted` wrapping the
    /// last attempt's error.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let mut state = RetryState::new(self.retry.clone());

        loop {
            tracing::debug!("Fetching {} (attempt {})", url, state.attempts());

            let error = match self.attempt(url).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            match state.next_delay(&error) {
                Some(delay) => {
                    tracing::warn!(
                        "{}; retry {}/{} in {:.1}s",
                        error,
                        state.retries(),
                        self.retry.max_retries,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::debug!(
                        "Giving up on {} after {} attempts and {:.1}s of backoff",
                        url,
                        state.attempts(),
                        state.total_delay().as_secs_f64()
                    );
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts: state.attempts(),
                        source: Box::new(error),
                    });
                }
            }
        }
    }

    /// Performs a single GET with a freshly chosen identity
    async fn attempt(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, self.identities.random())
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .header(header::UPGRADE_INSECURE_REQUESTS, "1")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = header_value(response.headers(), header::CONTENT_TYPE);
        let server = header_value(response.headers(), header::SERVER);

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        Ok(FetchResult {
            url: url.clone(),
            final_url,
            status_code: status.as_u16(),
            body,
            content_type,
            server,
            fetched_at: Utc::now(),
        })
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
