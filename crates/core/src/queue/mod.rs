//! Job queue.
//!
//! [`JobQueue`] is the delivery contract the worker pool consumes:
//! at-least-once delivery, ack on success, nack with optional redelivery
//! bounded by a maximum number of attempts. [`MemoryQueue`] implements it
//! in-process.

mod memory;
mod traits;
mod types;

pub use memory::MemoryQueue;
pub use traits::JobQueue;
pub use types::{Job, JobRecord, JobStatus, QueueError, RecordRetention, Redelivery};
