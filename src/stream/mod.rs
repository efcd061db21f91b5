//! Stream descriptor
//!
//! A `StreamDescriptor` is built once per run from a selected catalog entry.
//! It answers questions about the stream (replication mode, which request
//! parameter carries the watermark, which path to call) and reads and writes
//! the stream's bookmark through the `StateManager`.

use crate::catalog::{keys, CatalogEntry, MetadataMap};
use crate::config::TapConfig;
use crate::error::Result;
use crate::output::{Message, MessageSink};
use crate::state::StateManager;
use crate::transform::{sanitize_record, RecordTransformer};
use crate::types::{JsonValue, ReplicationMethod, WatermarkFormat};
use crate::watermark::Watermark;
use tracing::{debug, info};

/// One extractable stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    name: String,
    tap_stream_id: String,
    schema: JsonValue,
    metadata: MetadataMap,
    key_properties: Vec<String>,
}

impl StreamDescriptor {
    /// Build a descriptor from a catalog entry.
    ///
    /// Incremental streams must name a `replication-key`.
    pub fn from_catalog_entry(entry: &CatalogEntry) -> Result<Self> {
        let name = if entry.stream.is_empty() {
            entry.tap_stream_id.clone()
        } else {
            entry.stream.clone()
        };
        let metadata = entry.metadata_map();
        let key_properties = metadata.get_str_list(keys::TABLE_KEY_PROPERTIES);

        let descriptor = Self {
            tap_stream_id: if entry.tap_stream_id.is_empty() {
                name.clone()
            } else {
                entry.tap_stream_id.clone()
            },
            name,
            schema: entry.schema.clone(),
            metadata,
            key_properties,
        };

        if descriptor.is_incremental() {
            descriptor.replication_key()?;
        }
        Ok(descriptor)
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable stream identifier
    pub fn tap_stream_id(&self) -> &str {
        &self.tap_stream_id
    }

    /// JSON schema of the records
    pub fn schema(&self) -> &JsonValue {
        &self.schema
    }

    /// Stream metadata
    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Primary key fields
    pub fn key_properties(&self) -> &[String] {
        &self.key_properties
    }

    /// Replication method from `replication-method`, falling back to
    /// `forced-replication-method`
    pub fn replication_method(&self) -> ReplicationMethod {
        self.metadata
            .get_str(keys::REPLICATION_METHOD)
            .or_else(|| self.metadata.get_str(keys::FORCED_REPLICATION_METHOD))
            .map(ReplicationMethod::from_metadata)
            .unwrap_or_default()
    }

    /// True iff the replication method is `incremental` (any case)
    pub fn is_incremental(&self) -> bool {
        self.replication_method() == ReplicationMethod::Incremental
    }

    /// Field whose value is the watermark
    pub fn replication_key(&self) -> Result<&str> {
        self.metadata.require_str(&self.name, keys::REPLICATION_KEY)
    }

    /// Request parameter that carries the watermark: `incremental-search-key`
    /// if present, else `replication-key`
    pub fn filter_key(&self) -> Result<&str> {
        match self.metadata.get_str(keys::INCREMENTAL_SEARCH_KEY) {
            Some(key) => Ok(key),
            None => self.replication_key(),
        }
    }

    /// `api-path` if present, else the stream name
    pub fn api_path(&self) -> &str {
        self.metadata
            .get_str(keys::API_PATH)
            .unwrap_or(&self.name)
    }

    /// Request parameter `(filter key, formatted watermark)`
    pub fn watermark_param(
        &self,
        watermark: &Watermark,
        format: WatermarkFormat,
    ) -> Result<(String, String)> {
        Ok((self.filter_key()?.to_string(), watermark.format(format)))
    }

    /// Stored watermark, or `start_date` when there is none.
    ///
    /// A seeded watermark is persisted and checkpointed before it is returned.
    pub async fn current_bookmark(
        &self,
        state: &mut StateManager,
        config: &TapConfig,
        sink: &mut dyn MessageSink,
    ) -> Result<Watermark> {
        let key = self.replication_key()?;
        if let Some(stored) = state.get_bookmark(&self.name, key) {
            let watermark = Watermark::parse(stored)?;
            debug!("Stream '{}' resuming from {}", self.name, watermark);
            return Ok(watermark);
        }

        let seed = Watermark::parse_str(&config.start_date)?;
        info!("Stream '{}' has no bookmark, seeding from {}", self.name, seed);
        self.persist_bookmark(state, &seed, sink).await?;
        Ok(seed)
    }

    /// Store the watermark in canonical form and checkpoint the state
    pub async fn persist_bookmark(
        &self,
        state: &mut StateManager,
        watermark: &Watermark,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let key = self.replication_key()?;
        state.set_bookmark(&self.name, key, JsonValue::String(watermark.to_iso8601()));
        state.checkpoint(sink).await
    }

    /// Write the SCHEMA message for this stream
    pub fn emit_schema_declaration(&self, sink: &mut dyn MessageSink) -> Result<()> {
        let bookmark_properties = if self.is_incremental() {
            vec![self.replication_key()?.to_string()]
        } else {
            Vec::new()
        };
        sink.write_message(&Message::schema(
            &self.name,
            self.schema.clone(),
            self.key_properties.clone(),
            bookmark_properties,
        ))
    }

    /// Sanitize a record, then shape it against the schema and metadata
    pub fn transform_record(
        &self,
        transformer: &dyn RecordTransformer,
        record: &JsonValue,
    ) -> Result<JsonValue> {
        transformer.transform(
            &self.name,
            sanitize_record(record),
            &self.schema,
            &self.metadata,
        )
    }
}

impl std::fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
