//! Error types for the inspector module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while probing or validating a media file.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The probe output has no audio stream.
    #[error("no audio stream")]
    NoAudioStream,

    #[error("too many channels: {channels}")]
    TooManyChannels { channels: u32 },

    #[error("bad format: {format}")]
    BadFormat { format: String },

    #[error("bad codec: {codec}")]
    BadCodec { codec: String },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    ProberNotFound { path: PathBuf },

    /// ffprobe exited with a non-zero status.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// ffprobe output could not be understood.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    #[error("Probe timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectError {
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }

    /// Whether the file itself was rejected, as opposed to the probe failing.
    pub fn is_invalid_media(&self) -> bool {
        matches!(
            self,
            Self::NoAudioStream
                | Self::TooManyChannels { .. }
                | Self::BadFormat { .. }
                | Self::BadCodec { .. }
        )
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
