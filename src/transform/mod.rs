//! Record transformation
//!
//! Every extracted record is sanitized and then shaped by its stream's
//! schema before it is written.
//!
//! # Features
//!
//! - **Sanitizing**: `sanitize_record` drops non-ASCII characters and NUL bytes
//!   from every string, returning a new value
//! - **Field selection**: fields deselected or unsupported in metadata are dropped
//! - **Type coercion**: values are coerced to the schema's declared types
//!   (`"42"` for an integer field becomes `42`); impossible coercions are errors

mod sanitize;
mod schema;

pub use sanitize::{sanitize_record, sanitize_str};
pub use schema::{JsonType, PassthroughTransformer, SchemaTransformer};

use crate::catalog::MetadataMap;
use crate::error::Result;
use crate::types::JsonValue;

/// Shapes a sanitized record for output
pub trait RecordTransformer: Send + Sync {
    /// Transform one record of `stream` against its schema and metadata
    fn transform(
        &self,
        stream: &str,
        record: JsonValue,
        schema: &JsonValue,
        metadata: &MetadataMap,
    ) -> Result<JsonValue>;
}
