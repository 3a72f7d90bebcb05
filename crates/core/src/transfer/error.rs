//! Error types for the transfer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while downloading a source file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote answered with a non-2xx status.
    #[error("Source responded with status {status}")]
    Status { status: u16 },

    /// The connection failed or dropped mid-transfer.
    #[error("Network error while fetching source: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Fetching source timed out")]
    Timeout,

    /// Writing the staged file failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Whether a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status } => *status >= 500 || *status == 429,
            Self::Network(_) | Self::Timeout => true,
            Self::Io { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Network(e)
        }
    }
}

/// Errors raised while uploading the produced file.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The destination answered with a non-2xx status.
    #[error("Destination responded with status {status}")]
    Status { status: u16 },

    #[error("Network error while publishing output: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Publishing output timed out")]
    Timeout,

    /// Reading the staged file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Whether a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status } => *status >= 500 || *status == 429,
            Self::Network(_) | Self::Timeout => true,
            Self::Io { .. } => false,
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Network(e)
        }
    }
}
