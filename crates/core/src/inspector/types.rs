//! Normalized media metadata.

use serde::{Deserialize, Serialize};

/// Audio properties of a staged file, as reported by ffprobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    pub channels: u32,
    /// Absent for lossy codecs.
    pub bit_depth: Option<u32>,
    /// Duration in seconds.
    pub duration: f64,
    /// Exact length in samples, see [`duration_in_samples`](super::duration_in_samples).
    pub duration_in_samples: u64,
    /// Stream time base as a rational, e.g. `1/44100`.
    pub time_base: String,
    pub format_name: String,
    pub codec_name: String,
}
