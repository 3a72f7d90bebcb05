//! Types for the worker pool.

use serde::Serialize;

/// Snapshot of the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerPoolStatus {
    pub running: bool,
    /// Number of worker tasks.
    pub concurrency: usize,
    /// Jobs currently being processed.
    pub active_jobs: usize,
    /// Jobs waiting in the queue.
    pub queued_jobs: usize,
    /// Attempts that finished successfully.
    pub total_processed: u64,
    /// Attempts that failed, including retried ones.
    pub total_failed: u64,
}
