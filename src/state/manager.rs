//! State manager implementation
//!
//! Owns the run's state. Every checkpoint is written to the message sink as a
//! STATE message and, when a state file is configured, saved to that file
//! with atomic writes.

use super::types::State;
use crate::error::{Error, Result};
use crate::output::{Message, MessageSink};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// State manager for loading, updating and checkpointing state
#[derive(Debug, Default)]
pub struct StateManager {
    /// Path of the state file mirror, if any
    path: Option<PathBuf>,
    /// Current state
    state: State,
    /// Number of checkpoints emitted
    checkpoints: usize,
}

impl StateManager {
    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Wrap an existing state
    pub fn with_state(state: State) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Create a state manager from a file, loading existing state if present.
    ///
    /// Checkpoints are mirrored back to the same file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            parse_state(&contents)?
        } else {
            State::new()
        };

        Ok(Self {
            path: Some(path),
            state,
            checkpoints: 0,
        })
    }

    /// Create a state manager from inline JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::with_state(parse_state(json)?))
    }

    /// Mirror checkpoints to a file
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Path of the state file mirror
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check if there is no file mirror
    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }

    /// Current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Number of checkpoints emitted so far
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints
    }

    /// Bookmark for a stream and replication key
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&Value> {
        self.state.get_bookmark(stream, key)
    }

    /// Update a bookmark in memory; nothing is emitted until `checkpoint`
    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: Value) {
        self.state.set_bookmark(stream, key, value);
    }

    /// Emit the current state as a STATE message and save the file mirror
    pub async fn checkpoint<S: MessageSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        sink.write_message(&Message::state(&self.state))?;
        self.checkpoints += 1;
        self.save().await?;
        debug!("Checkpoint {} emitted", self.checkpoints);
        Ok(())
    }

    /// Save current state to the file mirror, if any
    pub async fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to_file(path).await,
            None => Ok(()),
        }
    }

    /// Save state to a specific file path
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let path = path.as_ref();
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        Ok(())
    }

    /// Export state as JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Consume the manager and return the state
    pub fn into_state(self) -> State {
        self.state
    }
}

fn parse_state(contents: &str) -> Result<State> {
    if contents.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(contents)
        .map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}
