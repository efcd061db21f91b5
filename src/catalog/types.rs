//! Catalog types

use super::keys;
use crate::error::{Error, Result, ResultExt};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Catalog
// ============================================================================

/// Streams available to a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog entries, in extraction order
    #[serde(default)]
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Entries that should be extracted, in catalog order
    pub fn selected_streams(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.streams.iter().filter(|entry| entry.is_selected())
    }

    /// Find an entry by stream name
    pub fn get(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|entry| entry.stream == stream)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Check if the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

// ============================================================================
// Catalog Entry
// ============================================================================

/// One stream of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable stream identifier
    #[serde(default)]
    pub tap_stream_id: String,

    /// Stream name
    pub stream: String,

    /// JSON schema of the stream's records
    #[serde(default)]
    pub schema: JsonValue,

    /// Breadcrumb-addressed metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Indexed view of the metadata
    pub fn metadata_map(&self) -> MetadataMap {
        MetadataMap::from_entries(&self.metadata)
    }

    /// Whether this stream should be extracted
    pub fn is_selected(&self) -> bool {
        self.metadata_map().is_selected()
    }
}

/// Metadata for one breadcrumb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// `[]` for the stream itself, `["properties", name]` for a field
    #[serde(default)]
    pub breadcrumb: Vec<String>,

    /// Metadata key -> value
    #[serde(default)]
    pub metadata: JsonObject,
}

impl MetadataEntry {
    /// Stream-level entry
    pub fn root(metadata: JsonObject) -> Self {
        Self {
            breadcrumb: Vec::new(),
            metadata,
        }
    }

    /// Field-level entry
    pub fn property(name: impl Into<String>, metadata: JsonObject) -> Self {
        Self {
            breadcrumb: vec!["properties".to_string(), name.into()],
            metadata,
        }
    }
}

// ============================================================================
// Metadata Map
// ============================================================================

/// Metadata indexed by breadcrumb
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataMap {
    root: JsonObject,
    properties: BTreeMap<String, JsonObject>,
}

impl MetadataMap {
    /// Index a metadata list; later entries for the same breadcrumb win key by key
    pub fn from_entries(entries: &[MetadataEntry]) -> Self {
        let mut map = Self::default();
        for entry in entries {
            let target = match entry.breadcrumb.as_slice() {
                [] => &mut map.root,
                [kind, name] if kind == "properties" => {
                    map.properties.entry(name.clone()).or_default()
                }
                _ => continue,
            };
            for (key, value) in &entry.metadata {
                target.insert(key.clone(), value.clone());
            }
        }
        map
    }

    /// Stream-level metadata
    pub fn root(&self) -> &JsonObject {
        &self.root
    }

    /// Stream-level value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.root.get(key).filter(|v| !v.is_null())
    }

    /// Stream-level string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    /// Stream-level string list; a single string counts as a one-element list
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            Some(JsonValue::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Stream-level string value that must be present
    pub fn require_str(&self, stream: &str, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| Error::missing_metadata(stream, key))
    }

    /// Field-level metadata
    pub fn property(&self, name: &str) -> Option<&JsonObject> {
        self.properties.get(name)
    }

    /// Whether a field is extracted: not `unsupported`, not explicitly
    /// deselected (unless `automatic`). Fields without metadata are kept.
    pub fn is_property_selected(&self, name: &str) -> bool {
        let Some(meta) = self.property(name) else {
            return true;
        };
        match meta.get(keys::INCLUSION).and_then(JsonValue::as_str) {
            Some(keys::UNSUPPORTED) => false,
            Some(keys::AUTOMATIC) => true,
            _ => meta
                .get(keys::SELECTED)
                .and_then(JsonValue::as_bool)
                .unwrap_or(true),
        }
    }

    /// Stream selection: `unsupported` never; else explicit `selected`; else
    /// `inclusion == automatic`
    pub fn is_selected(&self) -> bool {
        let inclusion = self.get_str(keys::INCLUSION);
        if inclusion == Some(keys::UNSUPPORTED) {
            return false;
        }
        if let Some(selected) = self.get(keys::SELECTED).and_then(JsonValue::as_bool) {
            return selected;
        }
        inclusion == Some(keys::AUTOMATIC)
    }
}
