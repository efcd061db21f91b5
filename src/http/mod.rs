//! HTTP client module
//!
//! Issues one logical request at a time, classifies the outcome and retries
//! transient failures with exponential backoff.
//!
//! # Features
//!
//! - **Classification**: connect/TLS/timeout failures and 429/502/503/504 are
//!   retried, every other non-2xx status fails immediately
//! - **Backoff**: doubling delay from a base, bounded attempt count
//! - **Rate Limiting**: optional token bucket using governor
//! - **Metrics**: one `request_duration` timer per attempt

mod client;
mod rate_limit;
mod request;

pub use client::{classify_status, RetryPolicy, RetryingClient, StatusClass};
pub use rate_limit::RateLimiter;
pub use request::{parse_link_header, HttpResponse, RequestDescriptor};
