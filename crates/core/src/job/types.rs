//! Types for the job orchestrator.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::inspector::MediaMetadata;
use crate::staging::StagedFile;

/// Stage of one job attempt.
///
/// Stages run strictly in declaration order; `Failed` is reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Fetching,
    ProbingInput,
    Transcoding,
    ProbingOutput,
    Publishing,
    Notifying,
    Done,
    Failed { reason: String },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::ProbingInput => "probing_input",
            Self::Transcoding => "transcoding",
            Self::ProbingOutput => "probing_output",
            Self::Publishing => "publishing",
            Self::Notifying => "notifying",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Called with the job id on every state transition.
pub type JobUpdateCallback = Arc<dyn Fn(&str, &JobState) + Send + Sync>;

/// Converted file handed to the caller in direct-stream mode.
///
/// Owns the staged output; dropping it removes the file. `stream` was opened
/// before the job reported success.
pub struct DirectOutput {
    pub file: StagedFile,
    pub stream: ReaderStream<File>,
    pub metadata: MediaMetadata,
    /// File name including extension, for `Content-Disposition`.
    pub file_name: String,
    pub content_type: &'static str,
    pub size: u64,
}

impl fmt::Debug for DirectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectOutput")
            .field("file", &self.file)
            .field("metadata", &self.metadata)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_done_and_failed_are_terminal() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed {
            reason: "boom".to_string()
        }
        .is_terminal());
        assert!(!JobState::Publishing.is_terminal());
        assert!(!JobState::Notifying.is_terminal());
    }
}
