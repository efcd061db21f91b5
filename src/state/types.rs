//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Complete tap state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// stream name -> replication key -> bookmark value
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Map<String, Value>>,

    /// Top-level keys other than `bookmarks`, carried through untouched
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark for a stream and replication key; `null` counts as absent
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&Value> {
        self.bookmarks
            .get(stream)?
            .get(key)
            .filter(|v| !v.is_null())
    }

    /// Set the bookmark for a stream and replication key
    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: Value) {
        self.bookmarks
            .entry(stream.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Remove all bookmarks for a stream
    pub fn clear_stream(&mut self, stream: &str) {
        self.bookmarks.remove(stream);
    }
}
