//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the soundshift server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Intake outcomes per submission endpoint
//! - Worker pool and queue status (collected on scrape)
//!
//! Job pipeline metrics live in `soundshift_core::metrics` and are registered
//! into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "soundshift_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "soundshift_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Intake Metrics
// =============================================================================

/// Submissions by endpoint mode and result (accepted, rejected).
pub static SUBMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_submissions_total", "Conversion submissions"),
        &["mode", "result"],
    )
    .unwrap()
});

// =============================================================================
// Worker Pool Metrics (collected on scrape)
// =============================================================================

pub static WORKER_POOL_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "soundshift_worker_pool_running",
        "Whether the worker pool is running (1) or stopped (0)",
    )
    .unwrap()
});

pub static WORKER_POOL_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "soundshift_worker_pool_active_jobs",
        "Jobs currently being processed",
    )
    .unwrap()
});

pub static QUEUE_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("soundshift_queue_pending_jobs", "Jobs waiting for a worker").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Intake
    registry
        .register(Box::new(SUBMISSIONS_TOTAL.clone()))
        .unwrap();

    // Worker pool
    registry
        .register(Box::new(WORKER_POOL_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(WORKER_POOL_ACTIVE.clone()))
        .unwrap();
    registry.register(Box::new(QUEUE_PENDING.clone())).unwrap();

    // Core metrics (jobs, stages, notifications, transfers)
    for metric in soundshift_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Update the worker pool gauges from the current application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.pool().status().await;
    WORKER_POOL_RUNNING.set(if status.running { 1 } else { 0 });
    WORKER_POOL_ACTIVE.set(status.active_jobs as i64);
    QUEUE_PENDING.set(status.queued_jobs as i64);
}

/// Normalize a path for metric labels (replace job ids with a placeholder).
pub fn normalize_path(path: &str) -> String {
    static UUID: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .unwrap()
    });
    UUID.replace_all(path, "{id}").to_string()
}
