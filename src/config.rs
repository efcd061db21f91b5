//! Tap configuration
//!
//! `TapConfig` is built once per invocation from the JSON config file and is
//! immutable afterwards. Streams share it through an `Arc`; nothing mutates it.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::types::{JsonValue, PaginationMode, ResponseKey, WatermarkFormat};
use crate::watermark::Watermark;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Keys every tap needs regardless of the source API
pub const REQUIRED_KEYS: &[&str] = &["base_url", "start_date"];

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Base URL for API requests; stream paths are appended to it
    pub base_url: String,

    /// Floor for incremental streams without a stored bookmark
    pub start_date: String,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Pagination strategy selector
    #[serde(default)]
    pub pagination: PaginationMode,

    /// Where records live inside a response body
    #[serde(default)]
    pub response_key: ResponseKey,

    /// How the watermark is rendered as a request parameter
    #[serde(default, alias = "watermark_format")]
    pub replication_key_format: WatermarkFormat,

    /// Persist the bookmark after every fully processed page instead of only at the end
    #[serde(default)]
    pub checkpoint_every_page: bool,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,
}

impl TapConfig {
    /// Build a config from a JSON value, checking `REQUIRED_KEYS` plus any
    /// caller-declared keys before deserializing.
    pub fn from_value(value: &JsonValue, extra_required: &[&str]) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::config("Config must be a JSON object"))?;

        for key in REQUIRED_KEYS.iter().chain(extra_required) {
            match object.get(*key) {
                None | Some(JsonValue::Null) => return Err(Error::missing_field(*key)),
                Some(_) => {}
            }
        }

        let config: TapConfig = serde_json::from_value(value.clone())
            .map_err(|e| Error::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>, extra_required: &[&str]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let value: JsonValue = serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        Self::from_value(&value, extra_required)
    }

    /// Fail fast on values that would only blow up once the sync is running
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        Watermark::parse_str(&self.start_date)
            .map_err(|e| Error::invalid_value("start_date", e.to_string()))?;
        if self.http.max_attempts == 0 {
            return Err(Error::invalid_value("http.max_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Full URL for an API path
    pub fn url_for(&self, api_path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = api_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per logical request, first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles every attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Optional client-side rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// User agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            requests_per_second: None,
            user_agent: default_user_agent(),
        }
    }
}

impl HttpSettings {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base backoff delay
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff cap
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    10
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("tapkit/{}", env!("CARGO_PKG_VERSION"))
}
