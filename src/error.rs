//! Error types for tapkit
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Only transient transport failures are recovered locally (inside the
//! retrying HTTP client). Everything else surfaces to the caller and ends
//! the sync run.

use thiserror::Error;

/// The main error type for tapkit
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Config file unreadable or malformed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A required config key is absent or null
    #[error("Missing required config field: {field}")]
    MissingConfigField {
        /// Config key
        field: String,
    },

    /// A config key is present but unusable
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue {
        /// Config key
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Catalog metadata needed by the stream is missing
    #[error("Stream '{stream}' is missing required metadata '{key}'")]
    MissingMetadata {
        /// Stream name
        stream: String,
        /// Metadata key
        key: String,
    },

    /// YAML parse failure
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parse failure
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    /// Non-retryable transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retryable status code
    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Request URL
        url: String,
        /// Response body
        body: String,
    },

    /// Every attempt failed with a retryable outcome
    #[error("Giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made, the first one included
        attempts: u32,
        /// Request URL
        url: String,
        /// Reason the last attempt failed
        last: String,
        /// Status of the last attempt; `None` for connection failures
        last_status: Option<u16>,
    },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    /// A value could not be read as a watermark
    #[error("Cannot normalize watermark value {value}: {message}")]
    WatermarkNormalization {
        /// Offending value
        value: String,
        /// Why it was rejected
        message: String,
    },

    /// The response body does not hold a record batch where expected
    #[error("Failed to extract records from response key '{key}': {message}")]
    RecordExtraction {
        /// Response key
        key: String,
        /// What was found instead
        message: String,
    },

    /// A record could not be coerced to its schema
    #[error("Record in stream '{stream}' failed validation: {message}")]
    Transform {
        /// Stream name
        stream: String,
        /// Failing field and reason
        message: String,
    },

    // ============================================================================
    // State Errors
    // ============================================================================
    /// State unreadable or unwritable
    #[error("State error: {message}")]
    State {
        /// What went wrong
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Error with added context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a missing metadata error
    pub fn missing_metadata(stream: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingMetadata {
            stream: stream.into(),
            key: key.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a watermark normalization error
    pub fn watermark(value: impl ToString, message: impl Into<String>) -> Self {
        Self::WatermarkNormalization {
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Create a record extraction error
    pub fn extraction(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordExtraction {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a transform error
    pub fn transform(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::RetriesExhausted { last_status, .. } => *last_status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Check if an HTTP status code is retryable (rate limited or upstream overloaded)
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Result type alias for tapkit
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("start_date");
        assert_eq!(err.to_string(), "Missing required config field: start_date");

        let err = Error::http_status(404, "https://api.example.com/orders", "Not found");
        assert_eq!(
            err.to_string(),
            "HTTP 404 from https://api.example.com/orders: Not found"
        );
    }

    #[test_case(429, true ; "rate limited")]
    #[test_case(502, true ; "bad gateway")]
    #[test_case(503, true ; "unavailable")]
    #[test_case(504, true ; "gateway timeout")]
    #[test_case(400, false ; "bad request")]
    #[test_case(401, false ; "unauthorized")]
    #[test_case(404, false ; "not found")]
    #[test_case(500, false ; "internal error")]
    fn test_status_classification(status: u16, retryable: bool) {
        assert_eq!(is_retryable_status(status), retryable);
        assert_eq!(Error::http_status(status, "u", "").is_retryable(), retryable);
    }

    #[test]
    fn test_non_request_errors_not_retryable() {
        assert!(!Error::config("x").is_retryable());
        assert!(!Error::watermark("abc", "bad").is_retryable());
        let exhausted = Error::RetriesExhausted {
            attempts: 10,
            url: "u".to_string(),
            last: "HTTP 503".to_string(),
            last_status: Some(503),
        };
        assert!(!exhausted.is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(Error::http_status(418, "u", "").status(), Some(418));
        assert_eq!(Error::config("x").status(), None);

        let exhausted = |last_status| Error::RetriesExhausted {
            attempts: 10,
            url: "u".to_string(),
            last: "x".to_string(),
            last_status,
        };
        assert_eq!(exhausted(Some(503)).status(), Some(503));
        assert_eq!(exhausted(None).status(), None);
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
