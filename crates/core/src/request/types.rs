//! Types for conversion requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample rates a client may ask for.
pub const ALLOWED_SAMPLE_RATES: [u32; 5] = [44_100, 48_000, 88_200, 96_000, 192_000];

/// The only bit rate accepted for mp3 output, in kbps.
pub const MP3_BIT_RATE: &str = "320";

/// Audio container formats handled by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Flac,
    Mp3,
}

impl AudioFormat {
    /// Parses a client supplied format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wav" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    /// File extension, also used as the ffmpeg muxer name.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
        }
    }

    /// Value of the `Content-Type` header for direct-stream responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Mp3 => "audio/mp3",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Mp3)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Output bit depth for lossless formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BitDepth {
    Sixteen,
    TwentyFour,
}

impl BitDepth {
    pub fn bits(&self) -> u8 {
        match self {
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> u8 {
        depth.bits()
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            other => Err(format!("unsupported bit depth: {}", other)),
        }
    }
}

/// Where the produced file goes once it passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Delivery {
    /// Upload with an HTTP PUT to the given URL.
    Push { output_url: String },
    /// Stream back as the response to the submitting request.
    Direct,
}

/// A validated conversion request.
///
/// Built only through [`validate_request`](super::validate_request), so every
/// field already satisfies the intake policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub input_url: String,
    pub input_format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,
    pub output_format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_codec: Option<String>,
    pub output_channels: u8,
    pub output_sample_rate: u32,
    /// Absent for mp3 output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bit_depth: Option<BitDepth>,
    /// Present (and equal to [`MP3_BIT_RATE`]) for mp3 output only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bit_rate: Option<String>,
    pub output_dither: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    pub delivery: Delivery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
    /// Opaque client value, echoed back verbatim in the notification.
    #[serde(default)]
    pub context: serde_json::Value,
}

impl ConversionRequest {
    /// Destination URL in push mode.
    pub fn output_url(&self) -> Option<&str> {
        match &self.delivery {
            Delivery::Push { output_url } => Some(output_url),
            Delivery::Direct => None,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.delivery, Delivery::Direct)
    }

    /// Base name for the produced file, before rate/depth decorations.
    pub fn base_name(&self) -> &str {
        self.output_name
            .as_deref()
            .or(self.input_name.as_deref())
            .unwrap_or("output")
    }
}

/// Bit rate as sent by clients, either `"320"` or `320`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BitRateValue {
    Text(String),
    Number(u64),
}

impl BitRateValue {
    pub fn normalized(&self) -> String {
        match self {
            Self::Text(s) => s.trim().trim_end_matches(['k', 'K']).to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Submission payload as received from a client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConversionRequest {
    pub input_url: Option<String>,
    pub input_format: Option<String>,
    pub input_name: Option<String>,
    pub output_format: Option<String>,
    pub output_codec: Option<String>,
    pub output_channels: Option<u64>,
    pub output_sample_rate: Option<u64>,
    pub output_bit_depth: Option<u64>,
    pub output_bit_rate: Option<BitRateValue>,
    /// Kept untyped so a non-boolean is a validation error, not a parse error.
    pub output_dither: Option<serde_json::Value>,
    pub output_name: Option<String>,
    pub output_url: Option<String>,
    pub notify_url: Option<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}
