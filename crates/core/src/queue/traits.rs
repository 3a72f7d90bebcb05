//! Queue contract consumed by the worker pool.

use async_trait::async_trait;

use super::types::{Job, JobRecord, QueueError, Redelivery};
use crate::request::ConversionRequest;

/// At-least-once job delivery with worker-side ack/nack.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a request and returns the job created for it.
    async fn enqueue(&self, request: ConversionRequest) -> Result<Job, QueueError>;

    /// Waits for the next job. Returns `None` once the queue is closed.
    async fn next(&self) -> Option<Job>;

    /// Marks a delivered job as completed.
    async fn ack(&self, id: &str) -> Result<(), QueueError>;

    /// Marks a delivered job as failed.
    ///
    /// The job is requeued when `retry` is set and attempts remain.
    async fn nack(&self, id: &str, error: &str, retry: bool) -> Result<Redelivery, QueueError>;

    async fn get(&self, id: &str) -> Option<JobRecord>;

    /// Number of jobs waiting for delivery.
    async fn pending(&self) -> usize;

    /// Stops delivery and wakes every waiting consumer.
    async fn close(&self);
}
