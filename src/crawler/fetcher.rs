//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client and the fixed header set the upstream expects
//! - The shared retry policy (network backoff, overload cooldown)
//! - Classifying responses into a [`FetchOutcome`]
//! - Per-sequence courtesy pacing

use crate::config::{Config, CrawlerConfig, UpstreamConfig};
use crate::{ConfigError, CrawlError};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Why a fetch did not produce a page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection error, timeout, or a body that could not be read
    Network(String),

    /// The upstream answered with a non-success status
    Status(u16),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(error) => write!(f, "network error: {}", error),
            Self::Status(code) => write!(f, "HTTP {}", code),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page body
    Success(String),

    /// A failure that may succeed later (network, rate limiting, 5xx).
    /// [`Fetcher::fetch`] has already spent the retry budget when it returns
    /// this; [`Fetcher::fetch_once`] has not.
    TransientFailure(FailureReason),

    /// A failure that will not succeed on retry (4xx other than 429)
    PermanentFailure(FailureReason),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// A response as seen by the retry loop
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Retry policy shared by every fetch path
///
/// | Condition          | Action                                              |
/// |--------------------|-----------------------------------------------------|
/// | Network error      | Retry up to `max_attempts`, `network_backoff` apart |
/// | `overload_status`  | Wait `overload_cooldown`, retry exactly once        |
/// | 429 / 5xx          | Surface as `TransientFailure`                       |
/// | Other 4xx          | Surface as `PermanentFailure`                       |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Wait between attempts after a network error
    pub network_backoff: Duration,
    /// Status the upstream sends when it is too busy to answer
    pub overload_status: u16,
    /// Wait before the single retry of an overloaded request
    pub overload_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            network_backoff: config.network_backoff(),
            overload_status: config.overload_status,
            overload_cooldown: config.overload_cooldown(),
        }
    }

    /// Maps a final response to an outcome
    pub fn classify(&self, response: RawResponse) -> FetchOutcome {
        match response.status {
            200..=299 => FetchOutcome::Success(response.body),
            status if status == 429 || status >= 500 || status == self.overload_status => {
                FetchOutcome::TransientFailure(FailureReason::Status(status))
            }
            status => FetchOutcome::PermanentFailure(FailureReason::Status(status)),
        }
    }
}

/// Runs `send` until it yields a response the policy accepts as final
///
/// Network errors are retried until `max_attempts` calls have been made; the
/// overload status earns one extra call after the cooldown, independent of
/// the network budget.
pub async fn run_with_retry<F, Fut>(policy: &RetryPolicy, mut send: F) -> FetchOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse, String>>,
{
    let mut attempt = 1u32;
    let mut overload_retried = false;

    loop {
        match send().await {
            Ok(response) if response.status == policy.overload_status && !overload_retried => {
                tracing::warn!(
                    "Upstream overloaded (HTTP {}), retrying in {:?}",
                    response.status,
                    policy.overload_cooldown
                );
                overload_retried = true;
                tokio::time::sleep(policy.overload_cooldown).await;
            }
            Ok(response) => return policy.classify(response),
            Err(error) => {
                if attempt >= policy.max_attempts {
                    tracing::warn!("Giving up after {} attempts: {}", attempt, error);
                    return FetchOutcome::TransientFailure(FailureReason::Network(error));
                }
                tracing::warn!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    error,
                    policy.network_backoff
                );
                tokio::time::sleep(policy.network_backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Builds the header set sent with every request
pub fn default_headers(upstream: &UpstreamConfig) -> Result<HeaderMap, ConfigError> {
    let base = Url::parse(&upstream.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
    let host = match (base.host_str(), base.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(ConfigError::InvalidUrl(format!(
                "base_url '{}' has no host",
                upstream.base_url
            )))
        }
    };

    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|e| ConfigError::Validation(format!("Invalid header value {:?}: {}", v, e)))
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate, br"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::HOST, value(&host)?);
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::USER_AGENT, value(&upstream.user_agent)?);
    Ok(headers)
}

/// Builds an HTTP client with proper configuration
pub fn build_http_client(config: &Config) -> Result<Client, CrawlError> {
    let client = Client::builder()
        .default_headers(default_headers(&config.upstream)?)
        .timeout(config.crawler.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;
    Ok(client)
}

/// Stateless page fetcher
///
/// Cloning is cheap; every worker holds its own handle.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        Ok(Self {
            client: build_http_client(config)?,
            policy: RetryPolicy::from_config(&config.crawler),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url` under the retry policy
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        tracing::debug!("GET {}", url);
        run_with_retry(&self.policy, || self.send_once(url)).await
    }

    /// Sends one request and classifies the response, without retrying
    ///
    /// For callers that keep their own attempt budget across requests.
    pub async fn fetch_once(&self, url: &str) -> FetchOutcome {
        tracing::debug!("GET {} (single attempt)", url);
        match self.send_once(url).await {
            Ok(response) => self.policy.classify(response),
            Err(error) => FetchOutcome::TransientFailure(FailureReason::Network(error)),
        }
    }

    async fn send_once(&self, url: &str) -> Result<RawResponse, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(describe_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(describe_error)?;
        Ok(RawResponse { status, body })
    }
}

fn describe_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timeout: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Enforces a minimum delay between consecutive requests of one sequence
///
/// Each worker (and each paginated listing) owns its own pacer, so pacing
/// never couples concurrent workers.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    last_request: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: None,
        }
    }

    /// Returns how long to wait before the next request may be sent
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let elapsed = now.duration_since(last);
        (elapsed < self.delay).then(|| self.delay - elapsed)
    }

    /// Waits out the courtesy delay, then records a request as sent
    pub async fn wait(&mut self) {
        if let Some(wait) = self.time_until_next_request(Instant::now()) {
            tokio::time::sleep(wait).await;
        }
        self.last_request = Some(Instant::now());
    }
}
