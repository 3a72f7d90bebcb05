//! Worker pool consuming the job queue.

mod pool;
mod types;

pub use pool::WorkerPool;
pub use types::WorkerPoolStatus;
