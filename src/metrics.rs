//! Metrics interface
//!
//! Timers and counters are handed to a `MetricsSink`. The default sink logs
//! each point as a `METRIC:` line through `tracing`, which lands on stderr
//! next to the rest of the log output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Name of the per-request timer
pub const REQUEST_DURATION: &str = "request_duration";

/// Name of the per-batch record counter
pub const RECORD_COUNT: &str = "record_count";

/// Kind of metric point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Duration in seconds
    Timer,
    /// Count of things
    Counter,
}

/// A single metric point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Timer or counter
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Metric name, e.g. `request_duration`
    pub metric: String,
    /// Seconds for timers, count for counters
    pub value: f64,
    /// Context such as endpoint, status or stream
    #[serde(default)]
    pub tags: BTreeMap<String, Value>,
}

impl Metric {
    /// Timer point, value in seconds
    pub fn timer(metric: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            kind: MetricKind::Timer,
            metric: metric.into(),
            value: elapsed.as_secs_f64(),
            tags: BTreeMap::new(),
        }
    }

    /// Counter point
    pub fn counter(metric: impl Into<String>, value: u64) -> Self {
        Self {
            kind: MetricKind::Counter,
            metric: metric.into(),
            value: value as f64,
            tags: BTreeMap::new(),
        }
    }

    /// Attach a tag
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Destination for metric points
pub trait MetricsSink: Send + Sync {
    /// Record one point
    fn record(&self, metric: Metric);
}

/// Logs every point through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record(&self, metric: Metric) {
        match serde_json::to_string(&metric) {
            Ok(line) => tracing::info!(target: "tapkit::metrics", "METRIC: {line}"),
            Err(e) => tracing::warn!("Failed to serialize metric {}: {e}", metric.metric),
        }
    }
}

/// Keeps every point in memory; handy for run summaries and tests
#[derive(Debug, Default)]
pub struct CollectingMetrics {
    points: Mutex<Vec<Metric>>,
}

impl CollectingMetrics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<Metric> {
        self.points
            .lock()
            .map(|points| points.clone())
            .unwrap_or_default()
    }

    /// Number of points recorded under a metric name
    pub fn count(&self, metric: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|m| m.metric == metric)
            .count()
    }

    /// Sum of the values recorded under a metric name
    pub fn total(&self, metric: &str) -> f64 {
        self.snapshot()
            .iter()
            .filter(|m| m.metric == metric)
            .map(|m| m.value)
            .sum()
    }
}

impl MetricsSink for CollectingMetrics {
    fn record(&self, metric: Metric) {
        if let Ok(mut points) = self.points.lock() {
            points.push(metric);
        }
    }
}
