//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - The politeness delay before every request
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::{Config, CrawlerConfig, RetryConfig};
use crate::state::ErrorKind;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Immutable retry settings
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub retryable_status_codes: Vec<u16>,
    pub skip_after_failures: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            initial_delay: Duration::from_secs_f64(config.initial_delay.max(0.0)),
            max_delay: Duration::from_secs_f64(config.max_delay.max(0.0)),
            retryable_status_codes: config.retryable_status_codes.clone(),
            skip_after_failures: config.skip_after_failures,
        }
    }

    /// Delay before retry number `retry` (1-based)
    ///
    /// `min(initial_delay * backoff_factor^(retry - 1), max_delay)`; zero for
    /// `retry == 0` (the first attempt).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());

        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_delay
        }
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: Url,

    /// URL after redirects
    pub final_url: Url,

    pub status: u16,

    /// Decoded body text
    pub body: String,
}

/// Fetch failure after the retry budget was spent (or skipped)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url} after {attempts} attempt(s)")]
    Status { url: String, status: u16, attempts: u32 },

    #[error("Request to {url} failed after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        message: String,
        attempts: u32,
    },
}

impl FetchError {
    /// Error kind recorded against the URL
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Status { status, .. } => classify_status(*status),
            Self::Transport { .. } => ErrorKind::Network,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Status { attempts, .. } | Self::Transport { attempts, .. } => *attempts,
        }
    }
}

/// Maps a failed HTTP status to an error kind
///
/// 5xx, 408 and 429 are network errors, other 4xx are client errors.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        408 | 429 => ErrorKind::Network,
        400..=499 => ErrorKind::Client,
        _ => ErrorKind::Network,
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent, request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use doc_mirror::config::CrawlerConfig;
/// use doc_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout().min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retry-aware HTTP GET
///
/// Sleeps the politeness delay before every attempt and the backoff delay
/// before every retry. Never touches the frontier.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy, request_delay: Duration) -> Self {
        Self {
            client,
            policy,
            request_delay,
        }
    }

    /// Builds the client and policy from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.crawler)?;
        Ok(Self::new(
            client,
            RetryPolicy::from_config(&config.retry),
            config.execution.request_delay(),
        ))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a page
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the decoded body |
    /// | Status in `retryable-status-codes` | Retry up to `max-retries` times |
    /// | Timeout / connect / body read failure | Retry up to `max-retries` times |
    /// | Any other status | Fail immediately |
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = self.policy.backoff_delay(attempt);
                tracing::debug!(
                    url = %url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            self.politeness_delay().await;

            let attempts = attempt + 1;
            let retries_left = attempt < self.policy.max_retries;

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    let final_url = response.url().clone();

                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => {
                                if attempt > 0 {
                                    tracing::debug!(url = %url, attempt, "Fetch succeeded after retry");
                                }
                                return Ok(FetchedPage {
                                    url: url.clone(),
                                    final_url,
                                    status: status.as_u16(),
                                    body,
                                });
                            }
                            Err(e) if retries_left => {
                                tracing::warn!(url = %url, attempt, error = %e, "Failed to read body");
                            }
                            Err(e) => {
                                return Err(FetchError::Transport {
                                    url: url.to_string(),
                                    message: e.to_string(),
                                    attempts,
                                });
                            }
                        }
                    } else if self.policy.is_retryable(status.as_u16()) && retries_left {
                        tracing::warn!(
                            url = %url,
                            attempt,
                            status = status.as_u16(),
                            "Retryable HTTP status"
                        );
                    } else {
                        return Err(status_error(url, status, attempts));
                    }
                }
                Err(e) if retries_left => {
                    tracing::warn!(url = %url, attempt, error = %e, "Request failed");
                }
                Err(e) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        message: describe_transport_error(&e),
                        attempts,
                    });
                }
            }

            attempt += 1;
        }
    }

    /// Downloads raw bytes (images) in a single attempt
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.politeness_delay().await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: describe_transport_error(&e),
                attempts: 1,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status, 1));
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
            attempts: 1,
        })?;

        Ok(bytes.to_vec())
    }

    async fn politeness_delay(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

fn status_error(url: &Url, status: StatusCode, attempts: u32) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        attempts,
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_redirect() {
        format!("Redirect error: {}", e)
    } else {
        e.to_string()
    }
}
