//! Error types for the job orchestrator.

use std::fmt;
use thiserror::Error;

use crate::inspector::InspectError;
use crate::notifier::SerializedError;
use crate::request::ValidationError;
use crate::staging::StagingError;
use crate::transcoder::TranscodeError;
use crate::transfer::{FetchError, PublishError};

/// Which file a media check ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSide {
    Input,
    Output,
}

impl fmt::Display for MediaSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Reason a job attempt failed.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The file was probed and rejected by the media policy.
    #[error("Invalid {side} media: {source}")]
    InvalidMedia {
        side: MediaSide,
        #[source]
        source: InspectError,
    },

    /// The probe itself failed.
    #[error("Probing {side} failed: {source}")]
    Probe {
        side: MediaSide,
        #[source]
        source: InspectError,
    },

    #[error("Transcode failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Wraps an inspection error, separating policy rejections from probe failures.
    pub fn media(side: MediaSide, source: InspectError) -> Self {
        if source.is_invalid_media() {
            Self::InvalidMedia { side, source }
        } else {
            Self::Probe { side, source }
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable identifier used in notifications and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Staging(_) => "staging",
            Self::Fetch(_) => "fetch",
            Self::InvalidMedia { .. } => "invalid_media",
            Self::Probe { .. } => "probe",
            Self::Transcode(_) => "transcode",
            Self::Publish(_) => "publish",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether redelivering the whole job may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::InvalidMedia { .. } | Self::Internal(_) => false,
            Self::Staging(_) => true,
            Self::Fetch(e) => e.is_retryable(),
            Self::Probe { source, .. } => source.is_retryable(),
            Self::Transcode(e) => e.is_retryable(),
            Self::Publish(e) => e.is_retryable(),
        }
    }

    /// Wire form for the failure notification.
    pub fn to_serialized(&self) -> SerializedError {
        SerializedError::from_error(self.kind(), self)
    }
}
