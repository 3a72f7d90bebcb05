//! Trait definitions for the transcoder module.

use async_trait::async_trait;

use super::error::TranscodeError;

/// Captured outcome of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Runs the external transcoding engine.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Runs the engine with `args`, which come from [`build_args`](super::build_args).
    ///
    /// A non-zero exit is reported as [`TranscodeError::Failed`].
    async fn run(&self, args: &[String]) -> Result<ExecResult, TranscodeError>;

    /// Validates that the engine is installed and runnable.
    async fn validate(&self) -> Result<(), TranscodeError>;
}
