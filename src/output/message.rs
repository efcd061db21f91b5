//! Message types written to the output stream

use crate::state::State;
use crate::types::JsonValue;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One line of tap output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    /// Declares the shape of a stream's records; precedes its first record
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of the records
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key fields, for incremental streams
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },

    /// A single extracted record
    Record {
        /// Stream name
        stream: String,
        /// Record payload
        record: JsonValue,
        /// When the record was extracted (RFC 3339)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<String>,
    },

    /// A checkpoint of the full state
    State {
        /// `{"bookmarks": {...}}`
        value: JsonValue,
    },
}

impl Message {
    /// Schema declaration
    pub fn schema(
        stream: impl Into<String>,
        schema: JsonValue,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
            bookmark_properties,
        }
    }

    /// Record stamped with the current time
    pub fn record(stream: impl Into<String>, record: JsonValue) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }

    /// State checkpoint
    pub fn state(state: &State) -> Self {
        Self::State {
            value: serde_json::to_value(state).unwrap_or_default(),
        }
    }

    /// Stream the message belongs to; `None` for STATE
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }
}
