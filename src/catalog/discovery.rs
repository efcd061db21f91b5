//! Discovery: stream definitions to catalog entries

use super::keys;
use super::types::{Catalog, CatalogEntry, MetadataEntry};
use crate::error::{Error, Result, ResultExt};
use crate::types::{JsonObject, JsonValue, ReplicationMethod};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Declarative description of one extractable stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,

    /// JSON schema; must have a `properties` object
    pub schema: JsonValue,

    /// Primary key fields
    #[serde(default)]
    pub key_properties: Vec<String>,

    /// Replication method
    #[serde(default)]
    pub replication_method: ReplicationMethod,

    /// Candidate replication keys
    #[serde(default)]
    pub valid_replication_keys: Vec<String>,

    /// Field whose value is the watermark
    #[serde(default)]
    pub replication_key: Option<String>,

    /// Request parameter carrying the watermark, if not the replication key
    #[serde(default)]
    pub incremental_search_key: Option<String>,

    /// Path appended to the base URL, if not the stream name
    #[serde(default)]
    pub api_path: Option<String>,

    /// Suggested default selection
    #[serde(default)]
    pub selected_by_default: Option<bool>,
}

impl StreamDefinition {
    /// Build the catalog entry for this stream
    pub fn to_catalog_entry(&self) -> Result<CatalogEntry> {
        let properties = self
            .schema
            .get("properties")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| {
                Error::config(format!(
                    "Stream '{}' schema has no 'properties' object",
                    self.name
                ))
            })?;

        let mut metadata = vec![MetadataEntry::root(self.root_metadata())];
        for field in properties.keys() {
            let inclusion = if self.key_properties.contains(field) {
                keys::AUTOMATIC
            } else {
                keys::AVAILABLE
            };
            let mut meta = JsonObject::new();
            meta.insert(keys::INCLUSION.to_string(), json!(inclusion));
            metadata.push(MetadataEntry::property(field.clone(), meta));
        }

        Ok(CatalogEntry {
            tap_stream_id: self.name.clone(),
            stream: self.name.clone(),
            schema: self.schema.clone(),
            metadata,
        })
    }

    fn root_metadata(&self) -> JsonObject {
        let mut meta = JsonObject::new();
        meta.insert(
            keys::TABLE_KEY_PROPERTIES.to_string(),
            json!(self.key_properties),
        );
        meta.insert(
            keys::REPLICATION_METHOD.to_string(),
            json!(self.replication_method),
        );
        if !self.valid_replication_keys.is_empty() {
            meta.insert(
                keys::VALID_REPLICATION_KEYS.to_string(),
                json!(self.valid_replication_keys),
            );
        }

        let optional = [
            (keys::REPLICATION_KEY, &self.replication_key),
            (keys::INCREMENTAL_SEARCH_KEY, &self.incremental_search_key),
            (keys::API_PATH, &self.api_path),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                meta.insert(key.to_string(), json!(value));
            }
        }
        if let Some(selected) = self.selected_by_default {
            meta.insert(keys::SELECTED_BY_DEFAULT.to_string(), json!(selected));
        }

        meta.insert(keys::INCLUSION.to_string(), json!(keys::AVAILABLE));
        meta.insert(keys::SCHEMA_NAME.to_string(), json!(self.name));
        meta
    }
}

impl Catalog {
    /// Build a catalog from stream definitions, in order
    pub fn discover(definitions: &[StreamDefinition]) -> Result<Self> {
        let streams = definitions
            .iter()
            .map(StreamDefinition::to_catalog_entry)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { streams })
    }

    /// Mark streams whose root metadata says `selected-by-default: true` as
    /// selected, unless a selection is already recorded
    pub fn select_defaults(&mut self) {
        for entry in &mut self.streams {
            for meta in &mut entry.metadata {
                if !meta.breadcrumb.is_empty() || meta.metadata.contains_key(keys::SELECTED) {
                    continue;
                }
                let default = meta
                    .metadata
                    .get(keys::SELECTED_BY_DEFAULT)
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false);
                if default {
                    meta.metadata.insert(keys::SELECTED.to_string(), json!(true));
                }
            }
        }
    }
}

/// Load stream definitions from a JSON or YAML file.
///
/// The file holds either a list of definitions or `{"streams": [...]}`.
/// `.yaml`/`.yml` files are read as YAML, everything else as JSON.
pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<StreamDefinition>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DefinitionFile {
        List(Vec<StreamDefinition>),
        Wrapped { streams: Vec<StreamDefinition> },
    }

    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stream definitions {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let file: DefinitionFile = if is_yaml {
        serde_yaml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    Ok(match file {
        DefinitionFile::List(streams) | DefinitionFile::Wrapped { streams } => streams,
    })
}
