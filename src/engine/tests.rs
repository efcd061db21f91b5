//! Tests for engine module

use super::*;
use crate::catalog::CatalogEntry;
use crate::metrics::{CollectingMetrics, REQUEST_DURATION};
use crate::output::MemorySink;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn tap_config(server: &MockServer, extra: Value) -> Arc<TapConfig> {
    let mut value = json!({
        "base_url": server.uri(),
        "start_date": "2020-01-01T00:00:00Z",
        "http": {"base_delay_ms": 1, "max_attempts": 3}
    });
    if let (Some(target), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    Arc::new(TapConfig::from_value(&value, &[]).unwrap())
}

fn engine(config: Arc<TapConfig>) -> SyncEngine<MemorySink> {
    SyncEngine::from_config(config, MemorySink::new()).unwrap()
}

fn orders_entry() -> CatalogEntry {
    serde_json::from_value(json!({
        "tap_stream_id": "orders",
        "stream": "orders",
        "schema": {
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "updated_at": {"type": ["null", "string"], "format": "date-time"}
            }
        },
        "metadata": [{
            "breadcrumb": [],
            "metadata": {
                "selected": true,
                "replication-method": "INCREMENTAL",
                "replication-key": "updated_at",
                "table-key-properties": ["id"]
            }
        }]
    }))
    .unwrap()
}

fn users_entry(selected: bool) -> CatalogEntry {
    serde_json::from_value(json!({
        "tap_stream_id": "users",
        "stream": "users",
        "schema": {"type": "object", "properties": {"id": {"type": "integer"}}},
        "metadata": [{
            "breadcrumb": [],
            "metadata": {"selected": selected, "replication-method": "FULL_TABLE"}
        }]
    }))
    .unwrap()
}

fn catalog(entries: Vec<CatalogEntry>) -> Catalog {
    Catalog { streams: entries }
}

fn orders_stream() -> StreamDescriptor {
    StreamDescriptor::from_catalog_entry(&orders_entry()).unwrap()
}

async fn mount_orders_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"id": 1, "updated_at": "2020-01-02"},
                    {"id": 2, "updated_at": "2020-01-03"}
                ]))
                .insert_header(
                    "link",
                    format!("<{}/orders?page=2>; rel=\"next\"", server.uri()).as_str(),
                ),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 3, "updated_at": "2020-01-04"}])),
        )
        .mount(server)
        .await;
}

fn record_ids(sink: &MemorySink, stream: &str) -> Vec<i64> {
    sink.records(stream)
        .iter()
        .filter_map(|r| r["id"].as_i64())
        .collect()
}

fn message_types(sink: &MemorySink) -> Vec<&'static str> {
    sink.messages()
        .iter()
        .map(|m| match m {
            Message::Schema { .. } => "SCHEMA",
            Message::Record { .. } => "RECORD",
            Message::State { .. } => "STATE",
        })
        .collect()
}

// ============================================================================
// Record Extraction Tests
// ============================================================================

#[test_case(json!([{"a": 1}, {"a": 2}]), ResponseKey::WholeBody, 2 ; "whole body array")]
#[test_case(json!({"data": [{"a": 1}]}), ResponseKey::Key("data".into()), 1 ; "literal key")]
#[test_case(json!({"orders": [{"a": 1}, {"a": 2}, {"a": 3}]}), ResponseKey::StreamName, 3 ; "stream name key")]
#[test_case(json!({"data": null}), ResponseKey::Key("data".into()), 0 ; "null batch")]
#[test_case(Value::Null, ResponseKey::StreamName, 0 ; "empty body")]
#[test_case(json!({"id": 1}), ResponseKey::WholeBody, 1 ; "single object")]
fn test_extract_records(body: Value, key: ResponseKey, expected: usize) {
    let records = extract_records(&body, &key, "orders").unwrap();
    assert_eq!(records.len(), expected);
}

#[test_case(json!({"other": []}), ResponseKey::Key("data".into()) ; "missing key")]
#[test_case(json!({"data": 5}), ResponseKey::Key("data".into()) ; "scalar batch")]
#[test_case(json!([1, 2]), ResponseKey::StreamName ; "keyed lookup on array")]
#[test_case(json!("text"), ResponseKey::WholeBody ; "string body")]
fn test_extract_records_errors(body: Value, key: ResponseKey) {
    let err = extract_records(&body, &key, "orders").unwrap_err();
    assert!(matches!(err, Error::RecordExtraction { .. }));
}

// ============================================================================
// Type Tests
// ============================================================================

#[test]
fn test_sync_stats() {
    let mut stats = SyncStats::new();
    stats.add_records(5);
    stats.add_page();
    stats.add_page();
    stats.add_stream();
    stats.set_duration(12);
    assert_eq!(stats.records_synced, 5);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.streams_synced, 1);
    assert_eq!(stats.duration_ms, 12);
}

#[test]
fn test_phase_display() {
    assert_eq!(SyncPhase::AdvanceWatermark.to_string(), "advance_watermark");
    assert_eq!(SyncPhase::Complete.to_string(), "complete");
}

#[test]
fn test_policies() {
    let stream = orders_stream();
    assert!(DefaultPolicy.should_emit(&stream, &[]));
    assert!(!DefaultPolicy.should_persist(&stream, 1));
    assert!(CheckpointEveryPage.should_persist(&stream, 1));
    assert!(!policy_for(false).should_persist(&stream, 3));
    assert!(policy_for(true).should_persist(&stream, 3));
}

// ============================================================================
// Incremental Sync Tests
// ============================================================================

#[tokio::test]
async fn test_orders_end_to_end() {
    let server = MockServer::start().await;
    mount_orders_pages(&server).await;

    let mut engine = engine(tap_config(&server, json!({"pagination": "next"})));
    let mut state = StateManager::in_memory();

    let stats = engine
        .sync_catalog(&catalog(vec![orders_entry()]), &mut state)
        .await
        .unwrap();

    assert_eq!(stats.streams_synced, 1);
    assert_eq!(stats.records_synced, 3);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-04T00:00:00Z"))
    );

    let sink = engine.into_sink();
    assert_eq!(record_ids(&sink, "orders"), vec![1, 2, 3]);
    assert_eq!(
        message_types(&sink),
        vec!["SCHEMA", "STATE", "RECORD", "RECORD", "RECORD", "STATE"]
    );
    assert_eq!(
        sink.states()[0]["bookmarks"]["orders"]["updated_at"],
        "2020-01-01T00:00:00Z"
    );
    assert_eq!(
        sink.last_state().unwrap()["bookmarks"]["orders"]["updated_at"],
        "2020-01-04T00:00:00Z"
    );
    assert_eq!(
        sink.records("orders")[0]["updated_at"],
        "2020-01-02T00:00:00Z"
    );
}

#[tokio::test]
async fn test_first_request_carries_formatted_watermark() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("updated_at", "1577836800"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = tap_config(&server, json!({"replication_key_format": "timestamp"}));
    let mut engine = engine(config);
    let mut state = StateManager::in_memory();

    let outcome = engine
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap();

    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.records, 0);
    assert_eq!(
        outcome.watermark.unwrap().to_iso8601(),
        "2020-01-01T00:00:00Z"
    );
}

#[tokio::test]
async fn test_incremental_search_key_used_as_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/orders"))
        .and(query_param("updated_since", "2020-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut entry = orders_entry();
    let root = &mut entry.metadata[0].metadata;
    root.insert("incremental-search-key".into(), json!("updated_since"));
    root.insert("api-path".into(), json!("v2/orders"));
    let stream = StreamDescriptor::from_catalog_entry(&entry).unwrap();

    let config = tap_config(&server, json!({"replication_key_format": "datestring"}));
    let mut state = StateManager::in_memory();
    engine(config)
        .sync_stream(&stream, &mut state)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_idempotent_restart() {
    let server = MockServer::start().await;
    mount_orders_pages(&server).await;
    let config = tap_config(&server, json!({"pagination": "next"}));

    let mut state = StateManager::in_memory();
    engine(Arc::clone(&config))
        .sync_catalog(&catalog(vec![orders_entry()]), &mut state)
        .await
        .unwrap();
    let first = state.state().clone();

    // Same pages again, starting from the persisted watermark
    engine(config)
        .sync_catalog(&catalog(vec![orders_entry()]), &mut state)
        .await
        .unwrap();

    assert_eq!(state.state(), &first);
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-04T00:00:00Z"))
    );
}

#[tokio::test]
async fn test_watermark_never_decreases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "updated_at": "2019-06-01T00:00:00Z"},
            {"id": 2, "updated_at": null},
            {"id": 3}
        ])))
        .mount(&server)
        .await;

    let mut state = StateManager::from_json(
        r#"{"bookmarks": {"orders": {"updated_at": "2020-02-01T00:00:00Z"}}}"#,
    )
    .unwrap();
    let outcome = engine(tap_config(&server, json!({})))
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap();

    assert_eq!(outcome.records, 3);
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-02-01T00:00:00Z"))
    );
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_seed_persisted_before_first_request_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine(tap_config(&server, json!({})));
    let mut state = StateManager::in_memory();

    let err = engine
        .sync_catalog(&catalog(vec![orders_entry()]), &mut state)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-01T00:00:00Z"))
    );
    assert_eq!(engine.sink().states().len(), 1);
}

#[tokio::test]
async fn test_fatal_mid_run_keeps_only_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "updated_at": "2020-01-02"}]))
                .insert_header(
                    "link",
                    format!("<{}/orders?page=2>; rel=\"next\"", server.uri()).as_str(),
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine(tap_config(&server, json!({"pagination": "next"})));
    let mut state = StateManager::in_memory();

    let err = engine
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-01T00:00:00Z"))
    );
    let sink = engine.into_sink();
    assert_eq!(sink.states().len(), 1);
    assert_eq!(record_ids(&sink, "orders"), vec![1]);
}

#[tokio::test]
async fn test_checkpoint_every_page_keeps_completed_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "updated_at": "2020-01-03"}]))
                .insert_header(
                    "link",
                    format!("<{}/orders?page=2>; rel=\"next\"", server.uri()).as_str(),
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = tap_config(
        &server,
        json!({"pagination": "next", "checkpoint_every_page": true}),
    );
    let mut engine = engine(config);
    let mut state = StateManager::in_memory();

    let err = engine
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-03T00:00:00Z"))
    );
    assert_eq!(engine.sink().states().len(), 2);
}

#[tokio::test]
async fn test_unparseable_replication_value_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "updated_at": "2020-01-05"},
            {"id": 2, "updated_at": {"weird": true}}
        ])))
        .mount(&server)
        .await;

    let mut state = StateManager::in_memory();
    let mut engine = engine(tap_config(&server, json!({})))
        .with_transformer(Box::new(crate::transform::PassthroughTransformer));

    let err = engine
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::WatermarkNormalization { .. }));
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-01T00:00:00Z"))
    );
}

// ============================================================================
// Full Sync Tests
// ============================================================================

#[tokio::test]
async fn test_full_sync_with_stream_name_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"id": 1}, {"id": "2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = tap_config(&server, json!({"response_key": "@stream"}));
    let mut engine = engine(config);
    let mut state = StateManager::in_memory();

    let stats = engine
        .sync_catalog(&catalog(vec![users_entry(true)]), &mut state)
        .await
        .unwrap();

    assert_eq!(stats.records_synced, 2);
    assert!(state.state().bookmarks.is_empty());

    let sink = engine.into_sink();
    assert_eq!(record_ids(&sink, "users"), vec![1, 2]);
    assert_eq!(message_types(&sink), vec!["SCHEMA", "RECORD", "RECORD"]);
}

#[tokio::test]
async fn test_full_sync_threshold_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param_is_missing("start_time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1000, "end_time": 1_577_923_200, "data": [{"id": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("start_time", "1577923200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1, "end_time": 1_578_009_600, "data": [{"id": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = tap_config(&server, json!({"pagination": "precise", "response_key": "data"}));
    let stream = StreamDescriptor::from_catalog_entry(&users_entry(true)).unwrap();
    let mut state = StateManager::in_memory();

    let outcome = engine(config)
        .sync_stream(&stream, &mut state)
        .await
        .unwrap();

    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.records, 2);
    assert!(outcome.watermark.is_none());
}

#[tokio::test]
async fn test_deselected_streams_are_not_requested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut engine = engine(tap_config(&server, json!({})));
    let mut state = StateManager::in_memory();
    let stats = engine
        .sync_catalog(&catalog(vec![users_entry(false)]), &mut state)
        .await
        .unwrap();

    assert_eq!(stats.streams_synced, 0);
    assert!(engine.sink().messages().is_empty());
}

// ============================================================================
// Policy and Metrics Tests
// ============================================================================

#[derive(Debug)]
struct EmitNothing;

impl SyncPolicy for EmitNothing {
    fn should_emit(&self, _stream: &StreamDescriptor, _batch: &[JsonValue]) -> bool {
        false
    }
}

#[tokio::test]
async fn test_suppressed_batches_still_advance_watermark() {
    let server = MockServer::start().await;
    mount_orders_pages(&server).await;

    let mut engine = engine(tap_config(&server, json!({"pagination": "next"})))
        .with_policy(Box::new(EmitNothing));
    let mut state = StateManager::in_memory();

    let outcome = engine
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap();

    assert_eq!(outcome.records, 0);
    assert_eq!(
        state.get_bookmark("orders", "updated_at"),
        Some(&json!("2020-01-04T00:00:00Z"))
    );
    assert!(engine.sink().records("orders").is_empty());
}

#[tokio::test]
async fn test_metrics_recorded() {
    let server = MockServer::start().await;
    mount_orders_pages(&server).await;

    let metrics = Arc::new(CollectingMetrics::new());
    let mut engine = engine(tap_config(&server, json!({"pagination": "next"})))
        .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>);
    let mut state = StateManager::in_memory();

    engine
        .sync_stream(&orders_stream(), &mut state)
        .await
        .unwrap();

    assert_eq!(metrics.count(REQUEST_DURATION), 2);
    assert_eq!(metrics.count(RECORD_COUNT), 2);
    assert!((metrics.total(RECORD_COUNT) - 3.0).abs() < f64::EPSILON);
}
