//! Common types used throughout tapkit
//!
//! This module contains shared type definitions, type aliases,
//! and the small selector enums read from the tap configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    #[default]
    GET,
    /// POST
    POST,
    /// PUT
    PUT,
    /// PATCH
    PATCH,
    /// DELETE
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Replication Method
// ============================================================================

/// How a stream is replicated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Re-read the whole resource every run
    #[default]
    #[serde(alias = "full_table", alias = "full")]
    FullTable,
    /// Read only records newer than the stored bookmark
    #[serde(alias = "incremental")]
    Incremental,
}

impl ReplicationMethod {
    /// Parse a metadata value, ignoring case. Anything but "incremental" is a full sync.
    pub fn from_metadata(value: &str) -> Self {
        if value.eq_ignore_ascii_case("incremental") {
            Self::Incremental
        } else {
            Self::FullTable
        }
    }
}

// ============================================================================
// Watermark Format
// ============================================================================

/// Representation of the watermark when it is sent as a request parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum WatermarkFormat {
    /// ISO 8601 instant, e.g. `2020-01-01T00:00:00Z`
    #[default]
    #[serde(rename = "iso8601")]
    Iso8601,
    /// Unix epoch seconds
    #[serde(rename = "timestamp")]
    Timestamp,
    /// Date only, `YYYY-MM-DD`
    #[serde(rename = "datestring")]
    DateString,
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(rename = "datetime_string")]
    DateTimeString,
    /// Bookmark sent exactly as stored
    #[serde(rename = "passthrough")]
    Passthrough,
}

impl From<String> for WatermarkFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "iso8601" => Self::Iso8601,
            "timestamp" => Self::Timestamp,
            "datestring" => Self::DateString,
            "datetime_string" => Self::DateTimeString,
            _ => Self::Passthrough,
        }
    }
}

// ============================================================================
// Pagination Mode
// ============================================================================

/// Pagination selector from the tap configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Single request per stream
    #[default]
    None,
    /// Follow the `rel="next"` Link header
    Next,
    /// Advance `start_time` while a full page of results comes back
    Precise,
}

// ============================================================================
// Response Key
// ============================================================================

/// Where the record batch lives inside a response body
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ResponseKey {
    /// The body itself is the batch
    #[default]
    WholeBody,
    /// The batch is nested under the stream's name
    StreamName,
    /// The batch is nested under a literal key
    Key(String),
}

impl ResponseKey {
    /// Sentinel config value meaning "use the stream name"
    pub const STREAM_NAME_SENTINEL: &'static str = "@stream";

    /// Resolve to a concrete key for the given stream, `None` for the whole body
    pub fn resolve<'a>(&'a self, stream: &'a str) -> Option<&'a str> {
        match self {
            Self::WholeBody => None,
            Self::StreamName => Some(stream),
            Self::Key(key) => Some(key),
        }
    }
}

impl From<Option<String>> for ResponseKey {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::WholeBody,
            Some(s) if s == Self::STREAM_NAME_SENTINEL => Self::StreamName,
            Some(s) => Self::Key(s),
        }
    }
}

impl From<ResponseKey> for Option<String> {
    fn from(value: ResponseKey) -> Self {
        match value {
            ResponseKey::WholeBody => None,
            ResponseKey::StreamName => Some(ResponseKey::STREAM_NAME_SENTINEL.to_string()),
            ResponseKey::Key(key) => Some(key),
        }
    }
}
