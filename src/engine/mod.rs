//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - syncs the selected streams of a catalog, one at a time
//! - `SyncPhase` - the phases a stream sync moves through
//! - `SyncPolicy` - emit and checkpoint hooks
//! - `extract_records` - pulls the record batch out of a response body
//!
//! A stream sync declares its schema, seeds its watermark (incremental
//! streams), then loops `Requesting -> Extracting -> Emitting ->
//! AdvanceWatermark -> ShouldPersist -> Paginating` until the pagination
//! strategy says `Done`. The final watermark is checkpointed at `Complete`.
//! Any error ends the stream; state only ever holds checkpoints written after
//! a fully processed page.

mod policy;
mod types;

pub use policy::{policy_for, CheckpointEveryPage, DefaultPolicy, SyncPolicy};
pub use types::{StreamOutcome, SyncPhase, SyncStats};

use crate::catalog::Catalog;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::http::{HttpResponse, RequestDescriptor, RetryingClient};
use crate::metrics::{Metric, MetricsSink, TracingMetrics, RECORD_COUNT};
use crate::output::{Message, MessageSink};
use crate::pagination::{NextPage, PaginationStrategy};
use crate::state::StateManager;
use crate::stream::StreamDescriptor;
use crate::transform::{RecordTransformer, SchemaTransformer};
use crate::types::{JsonValue, Method, ResponseKey};
use crate::watermark::Watermark;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One step of the page loop, carrying what the following step needs
enum Step {
    Request(RequestDescriptor),
    Extract(RequestDescriptor, HttpResponse),
    Emit(RequestDescriptor, HttpResponse, Vec<JsonValue>),
    Advance(RequestDescriptor, HttpResponse, Vec<JsonValue>),
    Persist(RequestDescriptor, HttpResponse),
    Paginate(RequestDescriptor, HttpResponse),
    Complete,
}

impl Step {
    fn phase(&self) -> SyncPhase {
        match self {
            Step::Request(..) => SyncPhase::Requesting,
            Step::Extract(..) => SyncPhase::Extracting,
            Step::Emit(..) => SyncPhase::Emitting,
            Step::Advance(..) => SyncPhase::AdvanceWatermark,
            Step::Persist(..) => SyncPhase::ShouldPersist,
            Step::Paginate(..) => SyncPhase::Paginating,
            Step::Complete => SyncPhase::Complete,
        }
    }
}

/// Sync engine for orchestrating data extraction
pub struct SyncEngine<S: MessageSink> {
    /// Tap configuration
    config: Arc<TapConfig>,
    /// HTTP client
    client: RetryingClient,
    /// Next-page strategy, chosen once
    paginator: Box<dyn PaginationStrategy>,
    /// Message output
    sink: S,
    /// Emit and checkpoint hooks
    policy: Box<dyn SyncPolicy>,
    /// Record shaping
    transformer: Box<dyn RecordTransformer>,
    /// Metrics destination
    metrics: Arc<dyn MetricsSink>,
    /// Statistics
    stats: SyncStats,
}

impl<S: MessageSink> SyncEngine<S> {
    /// Create a new sync engine.
    ///
    /// The policy follows `checkpoint_every_page`; records are shaped by a
    /// `SchemaTransformer`.
    pub fn new(
        config: Arc<TapConfig>,
        client: RetryingClient,
        paginator: Box<dyn PaginationStrategy>,
        sink: S,
    ) -> Self {
        let policy = policy_for(config.checkpoint_every_page);
        Self {
            config,
            client,
            paginator,
            sink,
            policy,
            transformer: Box::new(SchemaTransformer::new()),
            metrics: Arc::new(TracingMetrics),
            stats: SyncStats::default(),
        }
    }

    /// Create an engine with the client and pagination strategy the config asks for
    pub fn from_config(config: Arc<TapConfig>, sink: S) -> Result<Self> {
        let client = RetryingClient::from_config(&config)?;
        let paginator = config.pagination.build();
        Ok(Self::new(config, client, paginator, sink))
    }

    /// Set the emit/checkpoint policy
    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn SyncPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Set the record transformer
    #[must_use]
    pub fn with_transformer(mut self, transformer: Box<dyn RecordTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Send engine and client metrics to `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.client = self.client.with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    /// Tap configuration
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Message sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the engine and return the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Sync every selected stream of the catalog, in catalog order.
    ///
    /// The first failing stream ends the run.
    pub async fn sync_catalog(
        &mut self,
        catalog: &Catalog,
        state: &mut StateManager,
    ) -> Result<SyncStats> {
        let start = Instant::now();

        for entry in catalog.selected_streams() {
            let stream = StreamDescriptor::from_catalog_entry(entry)?;
            self.sync_stream(&stream, state).await?;
        }

        self.sink.flush()?;
        self.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Sync complete: {} streams, {} records, {} pages in {}ms",
            self.stats.streams_synced,
            self.stats.records_synced,
            self.stats.pages_fetched,
            self.stats.duration_ms
        );
        Ok(self.stats.clone())
    }

    /// Sync one stream
    pub async fn sync_stream(
        &mut self,
        stream: &StreamDescriptor,
        state: &mut StateManager,
    ) -> Result<StreamOutcome> {
        debug!("Stream '{}': {}", stream, SyncPhase::Init);
        let result = self.run_stream(stream, state).await;

        match &result {
            Ok(outcome) => {
                self.stats.add_stream();
                info!(
                    "Stream '{}' done: {} records over {} pages",
                    stream, outcome.records, outcome.pages
                );
            }
            Err(e) => {
                error!(
                    "Stream '{}' failed (url: {}, status: {}): {}",
                    stream,
                    error_url(e).unwrap_or("-"),
                    e.status().map_or_else(|| "-".to_string(), |s| s.to_string()),
                    e
                );
            }
        }
        result
    }

    async fn run_stream(
        &mut self,
        stream: &StreamDescriptor,
        state: &mut StateManager,
    ) -> Result<StreamOutcome> {
        debug!("Stream '{}': {}", stream, SyncPhase::DeclareSchema);
        stream.emit_schema_declaration(&mut self.sink)?;

        let request = RequestDescriptor::new(self.config.url_for(stream.api_path()));

        if !stream.is_incremental() {
            info!("Extracting {}", stream);
            return self.run_pages(stream, state, None, request).await;
        }

        debug!("Stream '{}': {}", stream, SyncPhase::SeedWatermark);
        let seed = stream
            .current_bookmark(state, &self.config, &mut self.sink)
            .await?;
        let (key, value) = stream.watermark_param(&seed, self.config.replication_key_format)?;
        info!("Extracting {} since {}", stream, value);

        let request = request.with_param(key, value);
        self.run_pages(stream, state, Some(seed), request).await
    }

    /// Page loop; `watermark` is `Some` for incremental streams
    async fn run_pages(
        &mut self,
        stream: &StreamDescriptor,
        state: &mut StateManager,
        mut watermark: Option<Watermark>,
        request: RequestDescriptor,
    ) -> Result<StreamOutcome> {
        let mut outcome = StreamOutcome::new(stream.name());
        let mut step = Step::Request(request);

        loop {
            debug!("Stream '{}': {}", stream, step.phase());

            step = match step {
                Step::Request(request) => {
                    let response = self.client.execute(&request, None, Method::GET).await?;
                    outcome.pages += 1;
                    self.stats.add_page();
                    Step::Extract(request, response)
                }

                Step::Extract(request, response) => {
                    let records =
                        extract_records(&response.body, &self.config.response_key, stream.name())?;
                    Step::Emit(request, response, records)
                }

                Step::Emit(request, response, records) => {
                    if self.policy.should_emit(stream, &records) {
                        outcome.records += self.emit_batch(stream, &records)?;
                    } else {
                        debug!("Stream '{}': skipping batch of {}", stream, records.len());
                    }

                    if watermark.is_some() {
                        Step::Advance(request, response, records)
                    } else {
                        Step::Paginate(request, response)
                    }
                }

                Step::Advance(request, response, records) => {
                    watermark = match watermark {
                        Some(current) => Some(advance_watermark(current, stream, &records)?),
                        None => None,
                    };
                    Step::Persist(request, response)
                }

                Step::Persist(request, response) => {
                    if let Some(current) = &watermark {
                        if self.policy.should_persist(stream, outcome.pages) {
                            stream
                                .persist_bookmark(state, current, &mut self.sink)
                                .await?;
                        }
                    }
                    Step::Paginate(request, response)
                }

                Step::Paginate(request, response) => match self.paginator.next(&response, &request)
                {
                    NextPage::Continue(next) if next == request => {
                        warn!(
                            "Stream '{}': next page request is identical to the last one, stopping",
                            stream
                        );
                        Step::Complete
                    }
                    NextPage::Continue(next) => Step::Request(next),
                    NextPage::Done => Step::Complete,
                },

                Step::Complete => {
                    if let Some(current) = &watermark {
                        stream
                            .persist_bookmark(state, current, &mut self.sink)
                            .await?;
                    }
                    outcome.watermark = watermark;
                    return Ok(outcome);
                }
            };
        }
    }

    /// Transform and write a batch, then count it
    fn emit_batch(&mut self, stream: &StreamDescriptor, records: &[JsonValue]) -> Result<usize> {
        for record in records {
            let record = stream.transform_record(self.transformer.as_ref(), record)?;
            self.sink
                .write_message(&Message::record(stream.name(), record))?;
        }

        self.stats.add_records(records.len());
        self.metrics.record(
            Metric::counter(RECORD_COUNT, records.len() as u64).tag("endpoint", stream.name()),
        );
        Ok(records.len())
    }
}

impl<S: MessageSink> std::fmt::Debug for SyncEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("client", &self.client)
            .field("paginator", &self.paginator)
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Pull the record batch out of a response body.
///
/// Arrays yield their elements, `null` (or an empty body) an empty batch and
/// a single object a one-record batch. A missing key or any other value is an
/// error.
pub fn extract_records(
    body: &JsonValue,
    key: &ResponseKey,
    stream: &str,
) -> Result<Vec<JsonValue>> {
    if body.is_null() {
        return Ok(Vec::new());
    }

    let (value, key_name) = match key.resolve(stream) {
        None => (body, "<body>"),
        Some(k) => match body {
            JsonValue::Object(map) => (
                map.get(k)
                    .ok_or_else(|| Error::extraction(k, "key not found in response"))?,
                k,
            ),
            other => {
                return Err(Error::extraction(
                    k,
                    format!("response body is not an object: {}", json_kind(other)),
                ))
            }
        },
    };

    match value {
        JsonValue::Array(items) => Ok(items.clone()),
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Object(_) => Ok(vec![value.clone()]),
        other => Err(Error::extraction(
            key_name,
            format!("expected records, got {}", json_kind(other)),
        )),
    }
}

/// Fold a batch's replication-key values into the watermark
fn advance_watermark(
    current: Watermark,
    stream: &StreamDescriptor,
    records: &[JsonValue],
) -> Result<Watermark> {
    let key = stream.replication_key()?;
    let before = current.clone();
    let next = current.advance_all(records.iter().filter_map(|r| r.get(key)))?;
    if next > before {
        debug!("Stream '{}': watermark {} -> {}", stream, before, next);
    }
    Ok(next)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn error_url(error: &Error) -> Option<&str> {
    match error {
        Error::HttpStatus { url, .. } | Error::RetriesExhausted { url, .. } => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
