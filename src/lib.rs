// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tapkit
//!
//! Extraction engine for REST API "taps": pull records from a paginated
//! HTTP API and write them to stdout as SCHEMA, RECORD and STATE JSON lines.
//!
//! ## Features
//!
//! - **Retrying HTTP**: 429/5xx and connection failures retried with exponential backoff
//! - **Pagination**: `Link` header, count threshold, or single page
//! - **Incremental Sync**: per-stream watermarks that only move forward
//! - **Catalog Selection**: streams and fields selected through catalog metadata
//! - **Checkpointing**: STATE messages plus an optional state file
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tapkit::{Catalog, JsonLinesSink, StateManager, SyncEngine, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> tapkit::Result<()> {
//!     let config = TapConfig::from_file("config.json", &[])?;
//!     let catalog = Catalog::from_file("catalog.json")?;
//!     let mut state = StateManager::from_file("state.json")?;
//!
//!     let mut engine = SyncEngine::from_config(Arc::new(config), JsonLinesSink::stdout())?;
//!     let stats = engine.sync_catalog(&catalog, &mut state).await?;
//!     eprintln!("{} records", stats.records_synced);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           SyncEngine                            │
//! │  Init → DeclareSchema → SeedWatermark → Requesting → Extracting │
//! │  → Emitting → AdvanceWatermark → ShouldPersist → Paginating     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Catalog  │   HTTP    │   Paginate    │ Transform │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Metadata │ Retry     │ Link Header   │ Sanitize  │ SCHEMA      │
//! │ Discover │ Backoff   │ Threshold     │ Coerce    │ RECORD      │
//! │ Selection│ Rate Limit│ Single Page   │ Select    │ STATE       │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Incremental watermarks
pub mod watermark;

/// Catalog, metadata and discovery
pub mod catalog;

/// Per-stream descriptor
pub mod stream;

/// Record sanitizing and schema coercion
pub mod transform;

/// State and checkpointing
pub mod state;

/// SCHEMA/RECORD/STATE messages
pub mod output;

/// Metrics
pub mod metrics;

/// Sync orchestrator
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogEntry, MetadataMap, StreamDefinition};
pub use config::TapConfig;
pub use engine::{SyncEngine, SyncStats};
pub use http::{RequestDescriptor, RetryingClient};
pub use output::{JsonLinesSink, MemorySink, Message, MessageSink};
pub use pagination::{NextPage, PaginationStrategy};
pub use state::{State, StateManager};
pub use stream::StreamDescriptor;
pub use watermark::Watermark;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
