//! Types for the job queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::QueueConfig;
use crate::request::ConversionRequest;

/// One unit of work handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 assigned at enqueue time.
    pub id: String,
    pub request: ConversionRequest,
    /// 1-based delivery count, 0 until first delivered.
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Job {
    pub fn new(request: ConversionRequest, max_attempts: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request,
            attempt: 0,
            max_attempts,
        }
    }

    /// Whether a failure of this delivery ends the job.
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Lifecycle of a job as tracked by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Queryable view of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl JobRecord {
    pub(crate) fn queued(job: &Job) -> Self {
        let now = Utc::now();
        Self {
            id: job.id.clone(),
            status: JobStatus::Queued,
            attempts: job.attempt,
            max_attempts: job.max_attempts,
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    pub(crate) fn transition(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// How long records of completed and failed jobs stay queryable.
///
/// A finished record is dropped once it is older than `max_age`, or when
/// more than `max_records` finished records are held (oldest first).
/// Queued and active records are never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRetention {
    pub max_age: Duration,
    pub max_records: usize,
}

impl Default for RecordRetention {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for RecordRetention {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_age: Duration::from_secs(config.finished_retention_secs),
            max_records: config.max_finished_records,
        }
    }
}

/// What the queue did with a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redelivery {
    /// The job will be delivered again.
    Requeued,
    /// The job is terminally failed.
    Exhausted,
}

/// Errors raised by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job is not active: {0}")]
    NotActive(String),
}
