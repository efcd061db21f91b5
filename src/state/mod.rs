//! State management module
//!
//! Tracks bookmarks between runs so incremental streams resume where they
//! left off.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - `{"bookmarks": {stream: {replication key: value}}}`
//! - `StateManager` - owns the state, emits STATE checkpoints and optionally
//!   mirrors them to a file with atomic writes

mod manager;
mod types;

pub use manager::StateManager;
pub use types::State;

#[cfg(test)]
mod manager_tests;
