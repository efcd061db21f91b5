//! Engine types
//!
//! Sync phases, per-stream outcomes and run statistics.

use crate::watermark::Watermark;

/// Phase of a stream sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Stream picked up, nothing done yet
    Init,
    /// Writing the SCHEMA message
    DeclareSchema,
    /// Resolving the starting watermark (incremental only)
    SeedWatermark,
    /// Waiting on the HTTP client
    Requesting,
    /// Pulling the record batch out of the response body
    Extracting,
    /// Consulting the emit policy and writing records
    Emitting,
    /// Folding the batch into the watermark (incremental only)
    AdvanceWatermark,
    /// Consulting the persist policy (incremental only)
    ShouldPersist,
    /// Asking the pagination strategy for the next request
    Paginating,
    /// Final checkpoint written, stream done
    Complete,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Init => "init",
            SyncPhase::DeclareSchema => "declare_schema",
            SyncPhase::SeedWatermark => "seed_watermark",
            SyncPhase::Requesting => "requesting",
            SyncPhase::Extracting => "extracting",
            SyncPhase::Emitting => "emitting",
            SyncPhase::AdvanceWatermark => "advance_watermark",
            SyncPhase::ShouldPersist => "should_persist",
            SyncPhase::Paginating => "paginating",
            SyncPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Result of syncing one stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    /// Stream name
    pub stream: String,
    /// Records written
    pub records: usize,
    /// Pages fetched
    pub pages: usize,
    /// Final watermark (incremental streams)
    pub watermark: Option<Watermark>,
}

impl StreamOutcome {
    /// Empty outcome for a stream
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            records: 0,
            pages: 0,
            watermark: None,
        }
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records synced
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Total streams synced
    pub streams_synced: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
