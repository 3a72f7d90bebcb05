//! Mock prober and transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

use crate::inspector::{InspectError, MediaMetadata, MediaProber};
use crate::transcoder::{ExecResult, TranscodeError, Transcoder};

use super::fixtures::{self, OUTPUT_BYTES};

/// Mock implementation of the MediaProber trait.
///
/// Files written by [`MockTranscoder`] (starting with [`OUTPUT_BYTES`]) get
/// the output metadata, anything else the input metadata.
///
/// # Example
///
/// ```rust,ignore
/// let prober = MockProber::new();
/// let mut surround = fixtures::wav_metadata();
/// surround.channels = 6;
/// prober.set_input_metadata(surround).await;
/// ```
#[derive(Debug)]
pub struct MockProber {
    input: Arc<RwLock<MediaMetadata>>,
    output: Arc<RwLock<MediaMetadata>>,
    probed: Arc<RwLock<Vec<PathBuf>>>,
    next_error: Arc<RwLock<Option<InspectError>>>,
    discard_output: AtomicBool,
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProber {
    pub fn new() -> Self {
        Self {
            input: Arc::new(RwLock::new(fixtures::wav_metadata())),
            output: Arc::new(RwLock::new(fixtures::flac_metadata())),
            probed: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            discard_output: AtomicBool::new(false),
        }
    }

    /// Delete converted files right after probing them, so the stage that
    /// follows finds nothing on disk.
    pub fn set_discard_output(&self) {
        self.discard_output.store(true, Ordering::SeqCst);
    }

    pub async fn set_input_metadata(&self, meta: MediaMetadata) {
        *self.input.write().await = meta;
    }

    pub async fn set_output_metadata(&self, meta: MediaMetadata) {
        *self.output.write().await = meta;
    }

    /// Configure the next probe to fail with the given error.
    pub async fn set_next_error(&self, error: InspectError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn probe_count(&self) -> usize {
        self.probed.read().await.len()
    }
}

#[async_trait]
impl MediaProber for MockProber {
    async fn inspect(&self, path: &Path) -> Result<MediaMetadata, InspectError> {
        self.probed.write().await.push(path.to_path_buf());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let content = tokio::fs::read(path).await?;
        if content.starts_with(OUTPUT_BYTES) {
            if self.discard_output.load(Ordering::SeqCst) {
                tokio::fs::remove_file(path).await?;
            }
            Ok(self.output.read().await.clone())
        } else {
            Ok(self.input.read().await.clone())
        }
    }
}

/// Mock implementation of the Transcoder trait.
///
/// Writes [`OUTPUT_BYTES`] to the last argument (the output path) and
/// records every argument list.
#[derive(Debug)]
pub struct MockTranscoder {
    runs: Arc<RwLock<Vec<Vec<String>>>>,
    next_error: Arc<RwLock<Option<TranscodeError>>>,
    panic_next: AtomicBool,
    gate: RwLock<Option<Arc<Semaphore>>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            panic_next: AtomicBool::new(false),
            gate: RwLock::new(None),
        }
    }

    /// Hold every later run until the returned semaphore is given a permit
    /// per run. A held run is already counted by [`run_count`](Self::run_count).
    pub async fn hold_runs(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.write().await = Some(Arc::clone(&gate));
        gate
    }

    /// Configure the next run to fail with the given error.
    pub async fn set_next_error(&self, error: TranscodeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make the next run panic, to exercise worker crash handling.
    pub fn set_panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    /// Argument lists of every run so far.
    pub async fn recorded_runs(&self) -> Vec<Vec<String>> {
        self.runs.read().await.clone()
    }

    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, args: &[String]) -> Result<ExecResult, TranscodeError> {
        self.runs.write().await.push(args.to_vec());

        let gate = self.gate.read().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("mock transcoder panic");
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(output) = args.last() {
            tokio::fs::write(output, OUTPUT_BYTES).await?;
        }

        Ok(ExecResult {
            exit_code: Some(0),
            ..Default::default()
        })
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}
