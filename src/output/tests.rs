//! Tests for the output module

use super::*;
use crate::state::State;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_schema_message_shape() {
    let msg = Message::schema(
        "orders",
        json!({"type": "object"}),
        vec!["id".to_string()],
        vec!["updated_at".to_string()],
    );
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({
            "type": "SCHEMA",
            "stream": "orders",
            "schema": {"type": "object"},
            "key_properties": ["id"],
            "bookmark_properties": ["updated_at"]
        })
    );
}

#[test]
fn test_schema_message_omits_empty_bookmark_properties() {
    let msg = Message::schema("users", json!({}), vec![], vec![]);
    let value = serde_json::to_value(&msg).unwrap();
    assert!(value.get("bookmark_properties").is_none());
    assert_eq!(value["key_properties"], json!([]));
}

#[test]
fn test_record_message_has_time_extracted() {
    let msg = Message::record("orders", json!({"id": 1}));
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["type"], "RECORD");
    assert_eq!(value["record"], json!({"id": 1}));
    assert!(value["time_extracted"].as_str().unwrap().ends_with('Z'));
    assert_eq!(msg.stream(), Some("orders"));
}

#[test]
fn test_state_message_wraps_bookmarks() {
    let mut state = State::new();
    state.set_bookmark("orders", "updated_at", json!("2020-01-04T00:00:00Z"));
    let msg = Message::state(&state);
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({
            "type": "STATE",
            "value": {"bookmarks": {"orders": {"updated_at": "2020-01-04T00:00:00Z"}}}
        })
    );
    assert_eq!(msg.stream(), None);
}

#[test]
fn test_message_deserialize() {
    let msg: Message =
        serde_json::from_str(r#"{"type":"RECORD","stream":"a","record":{"x":1}}"#).unwrap();
    assert_eq!(
        msg,
        Message::Record {
            stream: "a".to_string(),
            record: json!({"x": 1}),
            time_extracted: None,
        }
    );
}

// ============================================================================
// Sink Tests
// ============================================================================

#[test]
fn test_json_lines_sink_one_message_per_line() {
    let mut sink = JsonLinesSink::new(Vec::new());
    sink.write_message(&Message::schema("a", json!({}), vec![], vec![]))
        .unwrap();
    sink.write_message(&Message::record("a", json!({"x": "line\nbreak"})))
        .unwrap();
    sink.write_message(&Message::state(&State::new())).unwrap();
    assert_eq!(sink.messages_written(), 3);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        let _: Value = serde_json::from_str(line).unwrap();
    }
    assert!(lines[2].contains(r#""type":"STATE""#));
}

#[test]
fn test_memory_sink_helpers() {
    let mut sink = MemorySink::new();
    sink.write_message(&Message::schema("a", json!({}), vec![], vec![]))
        .unwrap();
    sink.write_message(&Message::record("a", json!({"x": 1})))
        .unwrap();
    sink.write_message(&Message::record("b", json!({"x": 2})))
        .unwrap();

    let mut state = State::new();
    state.set_bookmark("a", "x", json!(1));
    sink.write_message(&Message::state(&state)).unwrap();

    assert_eq!(sink.messages().len(), 4);
    assert_eq!(sink.records("a"), vec![&json!({"x": 1})]);
    assert_eq!(sink.schema_count("a"), 1);
    assert_eq!(sink.schema_count("b"), 0);
    assert_eq!(sink.states().len(), 1);
    assert_eq!(
        sink.last_state().unwrap()["bookmarks"]["a"]["x"],
        json!(1)
    );
}

#[test]
fn test_sink_through_mut_reference() {
    fn write_one<S: MessageSink>(mut sink: S) {
        sink.write_message(&Message::record("a", json!({}))).unwrap();
    }

    let mut sink = MemorySink::new();
    write_one(&mut sink);
    write_one(&mut sink);
    assert_eq!(sink.messages().len(), 2);
}
