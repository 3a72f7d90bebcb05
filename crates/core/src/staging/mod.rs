//! Staging files for one job execution.
//!
//! A [`StagingArea`] hands out [`StagedFile`]s: empty temporary files created
//! under the configured temp directory. A staged file is removed exactly once,
//! either by an explicit [`StagedFile::release`] (which reports removal
//! errors) or, on any other exit path including panics, when it is dropped.

use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while acquiring or releasing staging files.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The staging directory could not be created.
    #[error("Failed to prepare staging directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A temporary file could not be created.
    #[error("Failed to create staging file in {path}: {source}")]
    Acquire {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A temporary file could not be removed.
    #[error("Failed to remove staging file {path}: {source}")]
    Release {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directory in which staging files are created.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the staging directory if needed.
    pub async fn prepare(&self) -> Result<(), StagingError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StagingError::Prepare {
                path: self.root.clone(),
                source,
            })
    }

    /// Creates an empty staging file ending in `.{extension}`.
    ///
    /// The file descriptor is closed before returning; only the path is kept.
    pub fn acquire(&self, extension: &str) -> Result<StagedFile, StagingError> {
        let suffix = format!(".{}", extension);
        let file = tempfile::Builder::new()
            .prefix("soundshift-")
            .suffix(&suffix)
            .tempfile_in(&self.root)
            .map_err(|source| StagingError::Acquire {
                path: self.root.clone(),
                source,
            })?;

        let path = file.into_temp_path();
        debug!(path = %path.display(), "Acquired staging file");
        Ok(StagedFile { path })
    }

    /// Acquires the input and output files of one job.
    pub fn acquire_pair(
        &self,
        input_extension: &str,
        output_extension: &str,
    ) -> Result<StagingPair, StagingError> {
        let input = self.acquire(input_extension)?;
        // On failure `input` is dropped, which removes it.
        let output = self.acquire(output_extension)?;
        Ok(StagingPair { input, output })
    }
}

/// A temporary file owned by one job.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file from disk.
    pub fn release(self) -> Result<(), StagingError> {
        let path = self.path.to_path_buf();
        self.path
            .close()
            .map_err(|source| StagingError::Release {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Released staging file");
        Ok(())
    }
}

/// Input and output staging files of one job, released together.
#[derive(Debug)]
pub struct StagingPair {
    pub input: StagedFile,
    pub output: StagedFile,
}

impl StagingPair {
    /// Releases both files, attempting the second even if the first fails.
    pub fn release(self) -> Result<(), StagingError> {
        let input = self.input.release();
        let output = self.output.release();
        if let Err(ref e) = input {
            warn!(error = %e, "Failed to release input staging file");
        }
        input.and(output)
    }
}
