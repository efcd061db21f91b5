//! Retrying HTTP client
//!
//! Provides a client that handles:
//! - Building the outbound call from a `RequestDescriptor`
//! - Outcome classification (success, retryable, fatal)
//! - Exponential backoff with a bounded number of attempts
//! - Optional rate limiting and per-attempt timing metrics

use super::rate_limit::RateLimiter;
use super::request::{HttpResponse, RequestDescriptor};
use crate::auth::{AuthConfig, AuthStrategy};
use crate::config::{HttpSettings, TapConfig};
use crate::error::{is_retryable_status, Error, Result};
use crate::metrics::{Metric, MetricsSink, TracingMetrics, REQUEST_DURATION};
use crate::types::Method;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a status code is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// Rate limited or upstream overloaded
    Retryable,
    /// Everything else
    Fatal,
}

/// Classify an HTTP status code
pub fn classify_status(status: u16) -> StatusClass {
    if (200..300).contains(&status) {
        StatusClass::Success
    } else if is_retryable_status(status) {
        StatusClass::Retryable
    } else {
        StatusClass::Fatal
    }
}

/// Retry policy: `max_attempts` total attempts, delay doubling from `base_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

impl From<&HttpSettings> for RetryPolicy {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Result of a single attempt
enum Outcome {
    Success(HttpResponse),
    Retryable {
        reason: String,
        status: Option<u16>,
    },
    Fatal(Error),
}

/// HTTP client with retry, backoff and optional rate limiting
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
    auth: Arc<dyn AuthStrategy>,
    rate_limiter: Option<RateLimiter>,
    metrics: Arc<dyn MetricsSink>,
}

impl RetryingClient {
    /// Create a client from HTTP settings and an auth strategy
    pub fn new(settings: &HttpSettings, auth: Arc<dyn AuthStrategy>) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(&settings.user_agent)
            .build()?;

        Ok(Self {
            client,
            policy: RetryPolicy::from(settings),
            auth,
            rate_limiter: settings.requests_per_second.map(RateLimiter::per_second),
            metrics: Arc::new(TracingMetrics),
        })
    }

    /// Create a client from the tap config (HTTP settings and auth)
    pub fn from_config(config: &TapConfig) -> Result<Self> {
        Self::new(&config.http, config.auth.clone().into_strategy())
    }

    /// Create an unauthenticated client with default settings
    pub fn unauthenticated() -> Result<Self> {
        Self::new(&HttpSettings::default(), AuthConfig::None.into_strategy())
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the metrics sink
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Current retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Execute one logical request.
    ///
    /// Retryable failures are retried up to `max_attempts` in total; once the
    /// last attempt fails the error is returned as `RetriesExhausted`.
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        body: Option<&Value>,
        method: Method,
    ) -> Result<HttpResponse> {
        info!("Making {} request to {}", method, request.url);

        let mut attempt = 0;
        loop {
            attempt += 1;

            let (reason, last_status) = match self.attempt(request, body, method).await {
                Outcome::Success(response) => {
                    debug!(
                        "Request succeeded: {} {} ({})",
                        method, request.url, response.status
                    );
                    return Ok(response);
                }
                Outcome::Fatal(e) => return Err(e),
                Outcome::Retryable { reason, status } => (reason, status),
            };

            if attempt >= self.policy.max_attempts {
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    url: request.url.clone(),
                    last: reason,
                    last_status,
                });
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                "{}, attempt {}/{}, retrying {} in {:?}",
                reason, attempt, self.policy.max_attempts, request.url, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Issue a single attempt and classify it
    async fn attempt(
        &self,
        request: &RequestDescriptor,
        body: Option<&Value>,
        method: Method,
    ) -> Outcome {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.request(method.into(), &request.url);

        if !request.params.is_empty() {
            req = req.query(&request.params);
        }

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        req = self.auth.apply(req);

        let start = Instant::now();
        let result = req.send().await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let class = classify_status(status);
                let succeeded = class == StatusClass::Success;
                self.record_timer(&request.url, Some(status), succeeded, elapsed);

                match class {
                    StatusClass::Success => read_body(response).await,
                    StatusClass::Retryable => Outcome::Retryable {
                        reason: format!("Request failed with HTTP {status}"),
                        status: Some(status),
                    },
                    StatusClass::Fatal => {
                        let url = response.url().to_string();
                        let body = response.text().await.unwrap_or_default();
                        Outcome::Fatal(Error::http_status(status, url, body))
                    }
                }
            }
            Err(e) => {
                self.record_timer(&request.url, None, false, elapsed);
                if e.is_connect() || e.is_timeout() {
                    Outcome::Retryable {
                        reason: format!("Connection error: {e}"),
                        status: None,
                    }
                } else {
                    Outcome::Fatal(Error::Http(e))
                }
            }
        }
    }

    fn record_timer(&self, url: &str, status: Option<u16>, succeeded: bool, elapsed: Duration) {
        let mut metric = Metric::timer(REQUEST_DURATION, elapsed)
            .tag("endpoint", url)
            .tag("status", if succeeded { "succeeded" } else { "failed" });
        if let Some(status) = status {
            metric = metric.tag("http_status_code", status);
        }
        self.metrics.record(metric);
    }
}

/// Read and parse a 2xx body
async fn read_body(response: reqwest::Response) -> Outcome {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let headers = response.headers().clone();

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return Outcome::Fatal(Error::Http(e)),
    };

    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => return Outcome::Fatal(Error::JsonParse(e)),
        }
    };

    Outcome::Success(HttpResponse {
        status,
        url,
        headers,
        body,
    })
}

impl std::fmt::Debug for RetryingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingClient")
            .field("policy", &self.policy)
            .field("auth", &self.auth)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}
