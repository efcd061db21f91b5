//! Tests for StateManager

use super::*;
use crate::error::Error;
use crate::output::MemorySink;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
    assert!(manager.path().is_none());
    assert_eq!(manager.state(), &State::new());
}

#[test]
fn test_state_manager_from_json() {
    let manager = StateManager::from_json(
        r#"{"bookmarks": {"orders": {"updated_at": "2020-01-02T00:00:00Z"}}}"#,
    )
    .unwrap();
    assert!(manager.is_in_memory());
    assert_eq!(
        manager.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-02T00:00:00Z"))
    );
}

#[test]
fn test_state_manager_from_empty_json() {
    let manager = StateManager::from_json("  ").unwrap();
    assert!(manager.state().bookmarks.is_empty());
}

#[test]
fn test_state_manager_from_invalid_json() {
    let err = StateManager::from_json("{not json").unwrap_err();
    assert!(matches!(err, Error::State { .. }));
}

#[test]
fn test_state_manager_from_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let manager = StateManager::from_file(&path).unwrap();
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path(), Some(path.as_path()));
    assert!(manager.state().bookmarks.is_empty());
}

#[test]
fn test_state_manager_from_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{"bookmarks": {"users": {"modified": 1577923200}}, "currently_syncing": null}"#,
    )
    .unwrap();

    let manager = StateManager::from_file(&path).unwrap();
    assert_eq!(manager.get_bookmark("users", "modified"), Some(&json!(1_577_923_200)));
    assert!(manager.state().other.contains_key("currently_syncing"));
}

// ============================================================================
// Checkpoint Tests
// ============================================================================

#[tokio::test]
async fn test_set_bookmark_emits_nothing_until_checkpoint() {
    let mut manager = StateManager::in_memory();
    let mut sink = MemorySink::new();

    manager.set_bookmark("orders", "updated_at", json!("2020-01-01T00:00:00Z"));
    assert!(sink.states().is_empty());

    manager.checkpoint(&mut sink).await.unwrap();
    assert_eq!(manager.checkpoint_count(), 1);
    assert_eq!(
        sink.last_state().unwrap(),
        &json!({"bookmarks": {"orders": {"updated_at": "2020-01-01T00:00:00Z"}}})
    );
}

#[tokio::test]
async fn test_checkpoint_writes_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut manager = StateManager::in_memory().with_path(&path);
    let mut sink = MemorySink::new();

    manager.set_bookmark("orders", "updated_at", json!("2020-01-04T00:00:00Z"));
    manager.checkpoint(&mut sink).await.unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(reloaded.state(), manager.state());
}

#[tokio::test]
async fn test_checkpoint_overwrites_previous_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut manager = StateManager::from_file(&path).unwrap();
    let mut sink = MemorySink::new();

    manager.set_bookmark("orders", "updated_at", json!("2020-01-01T00:00:00Z"));
    manager.checkpoint(&mut sink).await.unwrap();
    manager.set_bookmark("orders", "updated_at", json!("2020-01-02T00:00:00Z"));
    manager.checkpoint(&mut sink).await.unwrap();

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(
        reloaded.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-02T00:00:00Z"))
    );
    assert_eq!(sink.states().len(), 2);
}

#[tokio::test]
async fn test_save_in_memory_is_noop() {
    let manager = StateManager::in_memory();
    manager.save().await.unwrap();
}

// ============================================================================
// Export Tests
// ============================================================================

#[test]
fn test_to_json() {
    let mut manager = StateManager::in_memory();
    manager.set_bookmark("a", "k", json!("v"));
    let json = manager.to_json().unwrap();
    assert_eq!(json, r#"{"bookmarks":{"a":{"k":"v"}}}"#);

    let state = manager.into_state();
    assert_eq!(state.get_bookmark("a", "k"), Some(&json!("v")));
}
