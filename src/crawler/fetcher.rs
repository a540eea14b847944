//! Anonymized HTTP fetching
//!
//! Every request goes through the Tor SOCKS proxy. Transient failures are
//! retried with a linear backoff, and the shared circuit rotator is asked
//! for a new circuit when the current exit looks blocked or keeps failing.
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Connect error, reset, timeout | Retry |
//! | HTTP 5xx | Retry |
//! | HTTP 403 / 429 | New circuit, then retry |
//! | Other HTTP 4xx | Fail immediately |
//! | Body larger than `max_body_bytes` | Fail immediately |
//! | Retries exhausted | New circuit, then fail |
//! | `rotate_after_failures` consecutive failures | New circuit |

use crate::config::{FetchConfig, TorConfig};
use crate::tor::CircuitRotator;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Proxy, StatusCode};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchedResource {
    /// Raw `Content-Type` header, if present and readable
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Why a fetch failed, after retries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("blocked with HTTP {0}")]
    Blocked(u16),

    #[error("response body exceeds {0} bytes")]
    TooLarge(u64),
}

impl FetchError {
    /// Returns true if another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::Blocked(_) => true,
            Self::HttpStatus(status) => *status >= 500,
            Self::TooLarge(_) => false,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    /// Short label used in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
            Self::HttpStatus(_) => "http",
            Self::Blocked(_) => "blocked",
            Self::TooLarge(_) => "too_large",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Retrieves one resource
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError>;
}

/// How hard a fetcher tries before giving up on a URL
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,

    /// Delay before attempt n+1 is `backoff * n`
    pub backoff: Duration,

    /// Consecutive failures, across URLs, that force a new circuit
    pub rotate_after_failures: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            rotate_after_failures: config.rotate_after_failures,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// Builds the HTTP client that sends everything through the Tor proxy
///
/// The `socks5h` scheme makes Tor resolve host names, which is required for
/// onion services and keeps DNS lookups off the local resolver.
pub fn build_tor_client(fetch: &FetchConfig, tor: &TorConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(fetch.user_agent.as_str())
        .timeout(Duration::from_secs(fetch.request_timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .proxy(Proxy::all(tor.proxy_url())?)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher routing requests over Tor with retry and circuit rotation
pub struct TorFetcher {
    client: Client,
    policy: RetryPolicy,
    rotator: Arc<CircuitRotator>,
    consecutive_failures: AtomicU32,
    max_body_bytes: u64,
}

impl TorFetcher {
    pub fn new(
        fetch: &FetchConfig,
        tor: &TorConfig,
        rotator: Arc<CircuitRotator>,
    ) -> Result<Self, reqwest::Error> {
        let client = build_tor_client(fetch, tor)?;
        Ok(Self::with_client(client, RetryPolicy::from_config(fetch), rotator)
            .with_max_body_bytes(fetch.max_body_bytes))
    }

    /// Uses an already built client, e.g. one without a proxy in tests
    pub fn with_client(client: Client, policy: RetryPolicy, rotator: Arc<CircuitRotator>) -> Self {
        Self {
            client,
            policy,
            rotator,
            consecutive_failures: AtomicU32::new(0),
            max_body_bytes: FetchConfig::default().max_body_bytes,
        }
    }

    /// Responses larger than this fail instead of being buffered
    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn rotator(&self) -> &Arc<CircuitRotator> {
        &self.rotator
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Blocked(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = self.read_body(&mut response).await?;

        Ok(FetchedResource {
            final_url,
            status: status.as_u16(),
            headers,
            body,
        })
    }

    /// Streams the body, giving up as soon as it passes the size limit
    async fn read_body(&self, response: &mut reqwest::Response) -> Result<Vec<u8>, FetchError> {
        if response.content_length().is_some_and(|len| len > self.max_body_bytes) {
            return Err(FetchError::TooLarge(self.max_body_bytes));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(FetchError::TooLarge(self.max_body_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    /// Asks for a new circuit and restarts the consecutive failure count
    async fn rotate(&self, seen_generation: u64, reason: &str) {
        tracing::info!("Rotating Tor circuit: {}", reason);
        self.rotator.rotate(seen_generation).await;
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for TorFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let generation = self.rotator.generation();

            let err = match self.fetch_once(url).await {
                Ok(resource) => {
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    return Ok(resource);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                tracing::debug!("Not retrying {}: {}", url, err);
                return Err(err);
            }

            let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!(
                "Attempt {}/{} for {} failed: {}",
                attempt,
                self.policy.max_attempts,
                url,
                err
            );

            if attempt >= self.policy.max_attempts {
                self.rotate(generation, "retries exhausted").await;
                return Err(err);
            }

            if err.is_blocked() {
                self.rotate(generation, "exit appears blocked").await;
            } else if self.policy.rotate_after_failures > 0
                && failures >= self.policy.rotate_after_failures
            {
                self.rotate(generation, "too many consecutive failures").await;
            }

            tokio::time::sleep(self.policy.backoff * attempt).await;
        }
    }
}
