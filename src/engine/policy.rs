//! Emit and persist policies

use crate::stream::StreamDescriptor;
use crate::types::JsonValue;

/// Hooks deciding whether a batch is written and whether the watermark is
/// checkpointed mid-stream. The final checkpoint of an incremental stream is
/// always written.
pub trait SyncPolicy: Send + Sync + std::fmt::Debug {
    /// Write this batch's records? The watermark advances either way.
    fn should_emit(&self, _stream: &StreamDescriptor, _batch: &[JsonValue]) -> bool {
        true
    }

    /// Checkpoint after page number `page` (1-based)?
    fn should_persist(&self, _stream: &StreamDescriptor, _page: usize) -> bool {
        false
    }
}

/// Emit everything, checkpoint only when the stream completes
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl SyncPolicy for DefaultPolicy {}

/// Emit everything, checkpoint after every fully processed page
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointEveryPage;

impl SyncPolicy for CheckpointEveryPage {
    fn should_persist(&self, _stream: &StreamDescriptor, _page: usize) -> bool {
        true
    }
}

/// Policy for the `checkpoint_every_page` config flag
pub fn policy_for(checkpoint_every_page: bool) -> Box<dyn SyncPolicy> {
    if checkpoint_every_page {
        Box::new(CheckpointEveryPage)
    } else {
        Box::new(DefaultPolicy)
    }
}
