//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external collaborator
//! trait, so the job pipeline can be exercised without ffmpeg or network.
//!
//! # Example
//!
//! ```rust,ignore
//! use soundshift_core::testing::{fixtures, MockCollaborators};
//!
//! let mocks = MockCollaborators::new();
//! let runner = mocks.runner(StagingArea::new(temp.path()));
//!
//! let job = Job::new(fixtures::push_request(), 1);
//! runner.run(&job).await?;
//! assert_eq!(mocks.publisher.upload_count().await, 1);
//! ```

mod mock_media;
mod mock_notifier;
mod mock_transfer;

pub use mock_media::{MockProber, MockTranscoder};
pub use mock_notifier::{MockNotifier, RecordedNotification};
pub use mock_transfer::{MockFetcher, MockPublisher, RecordedUpload};

use std::sync::Arc;

use crate::job::JobRunner;
use crate::staging::StagingArea;

/// One instance of every mock, shared with the runner built from them.
#[derive(Clone)]
pub struct MockCollaborators {
    pub fetcher: Arc<MockFetcher>,
    pub prober: Arc<MockProber>,
    pub transcoder: Arc<MockTranscoder>,
    pub publisher: Arc<MockPublisher>,
    pub notifier: Arc<MockNotifier>,
}

impl Default for MockCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCollaborators {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(MockFetcher::new()),
            prober: Arc::new(MockProber::new()),
            transcoder: Arc::new(MockTranscoder::new()),
            publisher: Arc::new(MockPublisher::new()),
            notifier: Arc::new(MockNotifier::new()),
        }
    }

    /// Builds a runner wired to these mocks.
    pub fn runner(&self, staging: StagingArea) -> JobRunner {
        JobRunner::new(
            staging,
            self.fetcher.clone(),
            self.prober.clone(),
            self.transcoder.clone(),
            self.publisher.clone(),
            self.notifier.clone(),
        )
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::inspector::MediaMetadata;
    use crate::request::{AudioFormat, BitDepth, ConversionRequest, Delivery};

    /// Body written by [`MockFetcher`](super::MockFetcher).
    pub const SOURCE_BYTES: &[u8] = b"RIFF-mock-source";

    /// Body written by [`MockTranscoder`](super::MockTranscoder).
    pub const OUTPUT_BYTES: &[u8] = b"fLaC-mock-output";

    /// Push-mode request: wav in, 48 kHz / 24-bit stereo flac out.
    pub fn push_request() -> ConversionRequest {
        ConversionRequest {
            input_url: "https://source.test/in.wav".to_string(),
            input_format: AudioFormat::Wav,
            input_name: Some("take-1".to_string()),
            output_format: AudioFormat::Flac,
            output_codec: None,
            output_channels: 2,
            output_sample_rate: 48_000,
            output_bit_depth: Some(BitDepth::TwentyFour),
            output_bit_rate: None,
            output_dither: false,
            output_name: None,
            delivery: Delivery::Push {
                output_url: "https://dest.test/out.flac".to_string(),
            },
            notify_url: Some("https://hooks.test/done".to_string()),
            context: json!({ "objectId": "abc" }),
        }
    }

    /// Direct-stream version of [`push_request`] without a notify URL.
    pub fn direct_request() -> ConversionRequest {
        ConversionRequest {
            delivery: Delivery::Direct,
            notify_url: None,
            ..push_request()
        }
    }

    /// 44.1 kHz / 16-bit stereo wav, three minutes long.
    pub fn wav_metadata() -> MediaMetadata {
        MediaMetadata {
            sample_rate: 44_100,
            channels: 2,
            bit_depth: Some(16),
            duration: 180.0,
            duration_in_samples: 7_938_000,
            time_base: "1/44100".to_string(),
            format_name: "wav".to_string(),
            codec_name: "pcm_s16le".to_string(),
        }
    }

    /// 48 kHz / 24-bit stereo flac, three minutes long.
    pub fn flac_metadata() -> MediaMetadata {
        MediaMetadata {
            sample_rate: 48_000,
            channels: 2,
            bit_depth: Some(24),
            duration: 180.0,
            duration_in_samples: 8_640_000,
            time_base: "1/48000".to_string(),
            format_name: "flac".to_string(),
            codec_name: "flac".to_string(),
        }
    }

    /// Push-mode submission body as a client would send it.
    pub fn push_request_json() -> serde_json::Value {
        json!({
            "input_url": "https://source.test/in.wav",
            "input_format": "wav",
            "input_name": "take-1",
            "output_format": "flac",
            "output_channels": 2,
            "output_sample_rate": 48000,
            "output_bit_depth": 24,
            "output_dither": false,
            "output_url": "https://dest.test/out.flac",
            "notify_url": "https://hooks.test/done",
            "context": { "objectId": "abc" }
        })
    }
}
