//! Job orchestration.
//!
//! [`JobRunner`] drives one attempt of a conversion job through its stages
//! and reports the outcome.

mod error;
mod runner;
mod types;

pub use error::{JobError, MediaSide};
pub use runner::JobRunner;
pub use types::{DirectOutput, JobState, JobUpdateCallback};
