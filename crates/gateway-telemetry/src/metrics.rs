//! Prometheus metrics for commit confirmation and query routing.
//!
//! Metrics live in a crate-local registry and are registered on first use.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Registry holding every gateway metric
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // COMMIT METRICS
    // =========================================================================

    /// Commit waits by final outcome
    pub static ref COMMITS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("gateway_commits_total", "Commit waits by outcome"),
        &["outcome"]  // outcome: passed/failed/rejected/timeout/cancelled
    ).expect("metric creation failed");

    /// Time from start_listening to resolution
    pub static ref COMMIT_WAIT_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "gateway_commit_wait_seconds",
            "Time spent waiting for commit events"
        ).buckets(exponential_buckets(0.01, 2.0, 14).expect("bucket layout"))
    ).expect("metric creation failed");

    /// Event sources live after the last establishment, per channel
    pub static ref EVENT_SOURCES_CONNECTED: GaugeVec = GaugeVec::new(
        Opts::new(
            "gateway_event_sources_connected",
            "Event sources connected after the last establishment"
        ),
        &["channel"]
    ).expect("metric creation failed");

    // =========================================================================
    // QUERY METRICS
    // =========================================================================

    /// Single-peer query attempts by outcome
    pub static ref QUERY_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("gateway_query_attempts_total", "Single-peer query attempts"),
        &["outcome"]  // outcome: success/failover/chaincode_error
    ).expect("metric creation failed");

    static ref REGISTERED: bool = register_all();
}

/// Final state of a commit wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Passed,
    Failed,
    Rejected,
    Timeout,
    Cancelled,
}

impl CommitOutcome {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of asking one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAttemptOutcome {
    Success,
    Failover,
    ChaincodeError,
}

impl QueryAttemptOutcome {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failover => "failover",
            Self::ChaincodeError => "chaincode_error",
        }
    }
}

fn register_all() -> bool {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMITS_TOTAL.clone()),
        Box::new(COMMIT_WAIT_SECONDS.clone()),
        Box::new(EVENT_SOURCES_CONNECTED.clone()),
        Box::new(QUERY_ATTEMPTS_TOTAL.clone()),
    ];

    let mut ok = true;
    for metric in metrics {
        if let Err(e) = REGISTRY.register(metric) {
            tracing::warn!(error = %e, "Metric registration failed");
            ok = false;
        }
    }
    ok
}

fn ensure_registered() {
    let _ = *REGISTERED;
}

/// Record a resolved commit wait.
pub fn record_commit_outcome(outcome: CommitOutcome, waited_secs: f64) {
    ensure_registered();
    COMMITS_TOTAL.with_label_values(&[outcome.as_label()]).inc();
    COMMIT_WAIT_SECONDS.observe(waited_secs);
}

/// Record one single-peer query attempt.
pub fn record_query_attempt(outcome: QueryAttemptOutcome) {
    ensure_registered();
    QUERY_ATTEMPTS_TOTAL
        .with_label_values(&[outcome.as_label()])
        .inc();
}

/// Publish the size of a freshly established event source pool.
pub fn set_event_sources_connected(channel: &str, count: usize) {
    ensure_registered();
    EVENT_SOURCES_CONNECTED
        .with_label_values(&[channel])
        .set(count as f64);
}

/// Drop the gauge series of a disposed channel.
pub fn clear_event_sources_connected(channel: &str) {
    ensure_registered();
    let _ = EVENT_SOURCES_CONNECTED.remove_label_values(&[channel]);
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    ensure_registered();
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
}
