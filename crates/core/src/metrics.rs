//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (outcomes, failures by kind, stage durations)
//! - Notifications (delivery results)
//! - Transfers (bytes fetched and published)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Finished job attempts by outcome.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_jobs_total", "Total finished job attempts"),
        &["mode", "outcome"], // mode: "push", "direct"; outcome: "success", "failed"
    )
    .unwrap()
});

/// Failed job attempts by error kind.
pub static JOB_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_job_failures_total", "Failed job attempts by kind"),
        &["kind"], // "fetch", "invalid_media", "transcode", "publish", ...
    )
    .unwrap()
});

/// Duration of each job stage in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("soundshift_stage_duration_seconds", "Duration of job stages")
            .buckets(vec![
                0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0,
            ]),
        &["stage"],
    )
    .unwrap()
});

/// Jobs requeued after a retryable failure.
pub static JOB_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("soundshift_job_retries_total", "Total job redeliveries").unwrap()
});

// =============================================================================
// Notifications
// =============================================================================

/// Notification deliveries by result.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_notifications_total", "Total notifications sent"),
        &["result"], // "delivered", "failed"
    )
    .unwrap()
});

// =============================================================================
// Transfers
// =============================================================================

/// Bytes moved over HTTP by direction.
pub static TRANSFER_BYTES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_transfer_bytes_total", "Total bytes transferred"),
        &["direction"], // "fetch", "publish"
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_FAILURES.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(JOB_RETRIES.clone()),
        Box::new(NOTIFICATIONS.clone()),
        Box::new(TRANSFER_BYTES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        JOBS_TOTAL.with_label_values(&["push", "success"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "soundshift_jobs_total"));
    }
}
