//! In-process queue backend.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

use super::traits::JobQueue;
use super::types::{Job, JobRecord, JobStatus, QueueError, RecordRetention, Redelivery};
use crate::request::ConversionRequest;

#[derive(Default)]
struct Inner {
    pending: VecDeque<Job>,
    active: HashMap<String, Job>,
    records: HashMap<String, JobRecord>,
    /// Ids of completed and failed jobs, oldest first.
    finished: VecDeque<String>,
}

impl Inner {
    fn finish(&mut self, id: &str, status: JobStatus) -> Result<(), QueueError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        record.transition(status);
        self.finished.push_back(id.to_string());
        Ok(())
    }

    /// Drops finished records past the retention window or the cap.
    fn prune(&mut self, retention: &RecordRetention) {
        let now = Utc::now();
        while let Some(id) = self.finished.front() {
            let expired = self.finished.len() > retention.max_records
                || self.records.get(id).map_or(true, |record| {
                    (now - record.updated_at)
                        .to_std()
                        .map_or(false, |age| age >= retention.max_age)
                });
            if !expired {
                break;
            }
            if let Some(id) = self.finished.pop_front() {
                self.records.remove(&id);
            }
        }
    }
}

/// FIFO queue with redelivery up to `max_attempts`.
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    available: Notify,
    closed: AtomicBool,
    max_attempts: u32,
    retention: RecordRetention,
}

impl MemoryQueue {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            available: Notify::new(),
            closed: AtomicBool::new(false),
            max_attempts: max_attempts.max(1),
            retention: RecordRetention::default(),
        }
    }

    /// Sets how long finished job records stay queryable.
    pub fn with_retention(mut self, retention: RecordRetention) -> Self {
        self.retention = retention;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn pop(&self) -> Option<Job> {
        let mut inner = self.inner.lock().await;
        let mut job = inner.pending.pop_front()?;
        job.attempt += 1;

        if let Some(record) = inner.records.get_mut(&job.id) {
            record.attempts = job.attempt;
            record.transition(JobStatus::Active);
        }
        inner.active.insert(job.id.clone(), job.clone());
        Some(job)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, request: ConversionRequest) -> Result<Job, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let job = Job::new(request, self.max_attempts);
        {
            let mut inner = self.inner.lock().await;
            inner.prune(&self.retention);
            inner.records.insert(job.id.clone(), JobRecord::queued(&job));
            inner.pending.push_back(job.clone());
        }
        self.available.notify_one();

        debug!(job_id = %job.id, "Job enqueued");
        Ok(job)
    }

    async fn next(&self) -> Option<Job> {
        loop {
            // Register interest before checking, so a notify between the
            // check and the await is not lost.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }
            if let Some(job) = self.pop().await {
                return Some(job);
            }

            notified.await;
        }
    }

    async fn ack(&self, id: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner
            .active
            .remove(id)
            .ok_or_else(|| QueueError::NotActive(id.to_string()))?;

        inner.finish(id, JobStatus::Completed)?;
        inner.prune(&self.retention);
        Ok(())
    }

    async fn nack(&self, id: &str, error: &str, retry: bool) -> Result<Redelivery, QueueError> {
        let redelivery = {
            let mut inner = self.inner.lock().await;
            let job = inner
                .active
                .remove(id)
                .ok_or_else(|| QueueError::NotActive(id.to_string()))?;

            let redelivery = if retry && !job.is_final_attempt() && !self.is_closed() {
                Redelivery::Requeued
            } else {
                Redelivery::Exhausted
            };

            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
            record.last_error = Some(error.to_string());

            match redelivery {
                Redelivery::Requeued => {
                    record.transition(JobStatus::Queued);
                    inner.pending.push_back(job);
                }
                Redelivery::Exhausted => {
                    inner.finish(id, JobStatus::Failed)?;
                    inner.prune(&self.retention);
                }
            }
            redelivery
        };

        if redelivery == Redelivery::Requeued {
            self.available.notify_one();
            info!(job_id = %id, "Job requeued");
        }
        Ok(redelivery)
    }

    async fn get(&self, id: &str) -> Option<JobRecord> {
        let mut inner = self.inner.lock().await;
        inner.prune(&self.retention);
        inner.records.get(id).cloned()
    }

    async fn pending(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.available.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_enqueue_then_next() {
        let queue = MemoryQueue::new(3);
        let job = queue.enqueue(fixtures::push_request()).await.unwrap();
        assert_eq!(queue.get(&job.id).await.unwrap().status, JobStatus::Queued);

        let delivered = queue.next().await.unwrap();
        assert_eq!(delivered.id, job.id);
        assert_eq!(delivered.attempt, 1);

        let record = queue.get(&job.id).await.unwrap();
        assert_eq!(record.status, JobStatus::Active);
        assert_eq!(record.attempts, 1);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let queue = MemoryQueue::new(1);
        let a = queue.enqueue(fixtures::push_request()).await.unwrap();
        let b = queue.enqueue(fixtures::push_request()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(queue.pending().await, 2);
    }

    #[tokio::test]
    async fn test_ack_completes() {
        let queue = MemoryQueue::new(3);
        let job = queue.enqueue(fixtures::push_request()).await.unwrap();
        queue.next().await.unwrap();
        queue.ack(&job.id).await.unwrap();

        assert_eq!(queue.get(&job.id).await.unwrap().status, JobStatus::Completed);
        assert!(matches!(
            queue.ack(&job.id).await.unwrap_err(),
            QueueError::NotActive(_)
        ));
    }

    #[tokio::test]
    async fn test_nack_requeues_until_exhausted() {
        let queue = MemoryQueue::new(2);
        let job = queue.enqueue(fixtures::push_request()).await.unwrap();

        queue.next().await.unwrap();
        let first = queue.nack(&job.id, "boom", true).await.unwrap();
        assert_eq!(first, Redelivery::Requeued);

        let again = queue.next().await.unwrap();
        assert_eq!(again.attempt, 2);
        assert!(again.is_final_attempt());

        let second = queue.nack(&job.id, "boom again", true).await.unwrap();
        assert_eq!(second, Redelivery::Exhausted);

        let record = queue.get(&job.id).await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("boom again"));
        assert_eq!(queue.pending().await, 0);
    }

    #[tokio::test]
    async fn test_nack_without_retry_fails_immediately() {
        let queue = MemoryQueue::new(5);
        let job = queue.enqueue(fixtures::push_request()).await.unwrap();
        queue.next().await.unwrap();

        let outcome = queue.nack(&job.id, "bad media", false).await.unwrap();
        assert_eq!(outcome, Redelivery::Exhausted);
    }

    #[tokio::test]
    async fn test_next_waits_for_enqueue() {
        let queue = Arc::new(MemoryQueue::new(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let job = queue.enqueue(fixtures::push_request()).await.unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(delivered.id, job.id);
    }

    async fn finish_one(queue: &MemoryQueue) -> String {
        let job = queue.enqueue(fixtures::push_request()).await.unwrap();
        queue.next().await.unwrap();
        queue.ack(&job.id).await.unwrap();
        job.id
    }

    #[tokio::test]
    async fn test_finished_records_are_capped() {
        let queue = MemoryQueue::new(1).with_retention(RecordRetention {
            max_age: Duration::from_secs(3600),
            max_records: 2,
        });

        let running = queue.enqueue(fixtures::push_request()).await.unwrap();
        queue.next().await.unwrap();
        let first = finish_one(&queue).await;
        let second = finish_one(&queue).await;
        let third = finish_one(&queue).await;

        assert!(queue.get(&first).await.is_none());
        assert_eq!(queue.get(&second).await.unwrap().status, JobStatus::Completed);
        assert_eq!(queue.get(&third).await.unwrap().status, JobStatus::Completed);
        // Unfinished jobs are never evicted.
        assert_eq!(queue.get(&running.id).await.unwrap().status, JobStatus::Active);
    }

    #[tokio::test]
    async fn test_finished_records_expire() {
        let queue = MemoryQueue::new(1).with_retention(RecordRetention {
            max_age: Duration::from_millis(50),
            max_records: 100,
        });

        let done = finish_one(&queue).await;
        let failed = queue.enqueue(fixtures::push_request()).await.unwrap();
        queue.next().await.unwrap();
        queue.nack(&failed.id, "bad media", false).await.unwrap();
        let queued = queue.enqueue(fixtures::push_request()).await.unwrap();

        assert!(queue.get(&done).await.is_some());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(queue.get(&done).await.is_none());
        assert!(queue.get(&failed.id).await.is_none());
        assert_eq!(queue.get(&queued.id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_close_wakes_consumers() {
        let queue = Arc::new(MemoryQueue::new(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close().await;

        let result = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_none());
        assert!(matches!(
            queue.enqueue(fixtures::push_request()).await.unwrap_err(),
            QueueError::Closed
        ));
    }
}
