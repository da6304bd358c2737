//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with pipeline-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperCast metrics
pub const METRICS_PREFIX: &str = "papercast";

/// Buckets for pipeline latency (in seconds); model inference dominates
pub const PIPELINE_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 1m
    120.0,  // 2m
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_counter!(
        format!("{}_pipeline_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Pipeline runs by kind and outcome"
    );

    describe_histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end pipeline latency in seconds"
    );

    describe_histogram!(
        format!("{}_stage_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Time spent reaching each pipeline stage"
    );

    describe_counter!(
        format!("{}_upstream_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Calls to external capabilities by service and outcome"
    );

    describe_counter!(
        format!("{}_papers_persisted_total", METRICS_PREFIX),
        Unit::Count,
        "Paper records committed"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record one pipeline run
pub struct PipelineTimer {
    start: Instant,
    stage_start: Instant,
    kind: &'static str,
}

impl PipelineTimer {
    /// Start timing a pipeline of the given kind
    pub fn start(kind: &'static str) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            stage_start: now,
            kind,
        }
    }

    /// Record the time taken to reach `stage` since the previous one
    pub fn stage(&mut self, stage: &'static str) {
        let now = Instant::now();

        histogram!(
            format!("{}_stage_duration_seconds", METRICS_PREFIX),
            "kind" => self.kind,
            "stage" => stage
        )
        .record(now.duration_since(self.stage_start).as_secs_f64());

        self.stage_start = now;
    }

    /// Record pipeline completion
    pub fn finish(self, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(
            format!("{}_pipeline_runs_total", METRICS_PREFIX),
            "kind" => self.kind,
            "status" => status
        )
        .increment(1);

        histogram!(
            format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
            "kind" => self.kind
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}

/// Helper to record request metrics
pub fn record_request(method: &str, endpoint: &str, status: u16) {
    counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Helper to record a call to an external capability
pub fn record_upstream(service: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_upstream_calls_total", METRICS_PREFIX),
        "service" => service,
        "status" => status
    )
    .increment(1);
}

/// Helper to record a committed paper
pub fn record_persisted(kind: &'static str) {
    counter!(
        format!("{}_papers_persisted_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}
