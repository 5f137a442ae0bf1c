//! Metrics and observability utilities
//!
//! Prometheus metrics for request latency, workflow transitions, listings,
//! and uploads. Every metric name carries the [`METRICS_PREFIX`].

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all newsroom metrics
pub const METRICS_PREFIX: &str = "newsroom";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    30.00,  // 30s, large uploads
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_workflow_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Workflow transition attempts by operation and outcome"
    );

    describe_counter!(
        format!("{}_article_listings_total", METRICS_PREFIX),
        Unit::Count,
        "Article listing queries by kind"
    );

    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Stored uploads by kind"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Count one workflow transition attempt.
///
/// `outcome` is one of `applied`, `forbidden`, `invalid`, `not_applicable`, or `error`.
pub fn record_transition(operation: &'static str, outcome: &'static str) {
    counter!(
        format!("{}_workflow_transitions_total", METRICS_PREFIX),
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Count one listing query (`role` or `public`)
pub fn record_listing(kind: &'static str) {
    counter!(
        format!("{}_article_listings_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

/// Count one stored upload (`media` or `profile`)
pub fn record_upload(kind: &'static str) {
    counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}
