//! Catalog module
//!
//! The catalog lists the streams a run may extract, each with its schema and
//! metadata. Runs read it; discovery produces it from stream definitions.
//!
//! # Overview
//!
//! - `Catalog`, `CatalogEntry`, `MetadataEntry` - the on-disk catalog format
//! - `MetadataMap` - breadcrumb-indexed view of an entry's metadata
//! - `StreamDefinition` - declarative stream description used by discovery

mod discovery;
mod types;

pub use discovery::{load_definitions, StreamDefinition};
pub use types::{Catalog, CatalogEntry, MetadataEntry, MetadataMap};

/// Metadata keys understood by the tap
pub mod keys {
    /// Stream inclusion (`automatic`, `available`, `unsupported`)
    pub const INCLUSION: &str = "inclusion";
    /// Explicit selection flag
    pub const SELECTED: &str = "selected";
    /// Default selection used by UIs
    pub const SELECTED_BY_DEFAULT: &str = "selected-by-default";
    /// Replication method chosen for the stream
    pub const REPLICATION_METHOD: &str = "replication-method";
    /// Replication method the stream must use
    pub const FORCED_REPLICATION_METHOD: &str = "forced-replication-method";
    /// Field whose value is the watermark
    pub const REPLICATION_KEY: &str = "replication-key";
    /// Candidate replication keys
    pub const VALID_REPLICATION_KEYS: &str = "valid-replication-keys";
    /// Request parameter carrying the watermark
    pub const INCREMENTAL_SEARCH_KEY: &str = "incremental-search-key";
    /// Path appended to the base URL
    pub const API_PATH: &str = "api-path";
    /// Primary key fields
    pub const TABLE_KEY_PROPERTIES: &str = "table-key-properties";
    /// Name of the schema
    pub const SCHEMA_NAME: &str = "schema-name";

    /// `inclusion` value: always extracted
    pub const AUTOMATIC: &str = "automatic";
    /// `inclusion` value: extracted when selected
    pub const AVAILABLE: &str = "available";
    /// `inclusion` value: never extracted
    pub const UNSUPPORTED: &str = "unsupported";
}
