//! ffprobe-backed media inspection.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::InspectError;
use super::types::MediaMetadata;
use crate::transcoder::ConverterConfig;

/// Extracts [`MediaMetadata`] from a staged file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<MediaMetadata, InspectError>;
}

/// Runs `ffprobe` and parses its JSON output.
pub struct FfprobeInspector {
    config: ConverterConfig,
}

impl FfprobeInspector {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    fn args(path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            "-select_streams".to_string(),
            "a".to_string(),
            "-i".to_string(),
            path.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl MediaProber for FfprobeInspector {
    async fn inspect(&self, path: &Path) -> Result<MediaMetadata, InspectError> {
        let child = Command::new(&self.config.ffprobe_path)
            .args(Self::args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InspectError::ProberNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    InspectError::Io(e)
                }
            })?;

        let timeout_secs = self.config.probe_timeout_secs;
        let output = timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| InspectError::Timeout { timeout_secs })??;

        if !output.status.success() {
            return Err(InspectError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(path = %path.display(), output = %stdout, "ffprobe output");
        parse_probe_output(&stdout)
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: String,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    bits_per_sample: u32,
    bits_per_raw_sample: Option<String>,
    time_base: Option<String>,
    duration_ts: Option<u64>,
    duration: Option<String>,
}

/// Parses `ffprobe -print_format json -show_format -show_streams` output.
///
/// The first audio stream is used. `format_name` is kept verbatim, so a
/// demuxer reporting several names (e.g. `mov,mp4,m4a`) fails the policy.
pub fn parse_probe_output(output: &str) -> Result<MediaMetadata, InspectError> {
    let probe: ProbeOutput = serde_json::from_str(output)
        .map_err(|e| InspectError::parse_error(format!("Failed to parse ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().map_or(true, |t| t == "audio"))
        .ok_or(InspectError::NoAudioStream)?;

    let format = probe
        .format
        .ok_or_else(|| InspectError::parse_error("missing format section"))?;

    let sample_rate = stream
        .sample_rate
        .as_deref()
        .and_then(|r| r.parse::<u32>().ok())
        .ok_or_else(|| InspectError::parse_error("missing sample_rate"))?;

    let channels = stream
        .channels
        .ok_or_else(|| InspectError::parse_error("missing channels"))?;

    let time_base = stream
        .time_base
        .clone()
        .unwrap_or_else(|| format!("1/{}", sample_rate));

    let duration_text = stream.duration.as_deref().or(format.duration.as_deref());
    let duration = duration_text
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let samples = match stream.duration_ts {
        Some(ticks) => duration_in_samples(ticks, sample_rate, &time_base)?,
        None => match duration_text {
            Some(text) => seconds_to_samples(text, sample_rate)?.unwrap_or(0),
            None => 0,
        },
    };

    Ok(MediaMetadata {
        sample_rate,
        channels,
        bit_depth: bit_depth(stream),
        duration,
        duration_in_samples: samples,
        time_base,
        format_name: format.format_name,
        codec_name: stream
            .codec_name
            .clone()
            .ok_or_else(|| InspectError::parse_error("missing codec_name"))?,
    })
}

/// `bits_per_sample`, or `bits_per_raw_sample` for codecs like flac that
/// report 0 there. `None` when neither is set, which is the case for mp3.
fn bit_depth(stream: &ProbeStream) -> Option<u32> {
    if stream.bits_per_sample > 0 {
        return Some(stream.bits_per_sample);
    }
    stream
        .bits_per_raw_sample
        .as_deref()
        .and_then(|b| b.parse::<u32>().ok())
        .filter(|b| *b > 0)
}

/// Converts a duration in time-base ticks into samples.
///
/// `ticks * num * sample_rate / den`, in integer arithmetic and truncated.
pub fn duration_in_samples(
    ticks: u64,
    sample_rate: u32,
    time_base: &str,
) -> Result<u64, InspectError> {
    let (num, den) = parse_rational(time_base)
        .ok_or_else(|| InspectError::parse_error(format!("invalid time_base: {}", time_base)))?;

    let samples = (ticks as u128)
        .checked_mul(num as u128)
        .and_then(|v| v.checked_mul(sample_rate as u128))
        .map(|v| v / den as u128)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| InspectError::parse_error("duration_in_samples overflows"))?;
    Ok(samples)
}

fn parse_rational(value: &str) -> Option<(u64, u64)> {
    let (num, den) = value.split_once('/')?;
    let num = num.trim().parse::<u64>().ok()?;
    let den = den.trim().parse::<u64>().ok()?;
    (den > 0).then_some((num, den))
}

/// Samples in a decimal seconds string such as `"180.500000"`, without
/// going through floating point. `Ok(None)` when the text is not a number.
fn seconds_to_samples(seconds: &str, sample_rate: u32) -> Result<Option<u64>, InspectError> {
    let overflow = || InspectError::parse_error("duration_in_samples overflows");
    let (whole, frac) = seconds.trim().split_once('.').unwrap_or((seconds.trim(), ""));
    let digits = format!("{}{}", whole, frac);
    let Ok(value) = digits.parse::<u128>() else {
        return Ok(None);
    };
    let scale = 10u128.checked_pow(frac.len() as u32).ok_or_else(overflow)?;
    let samples = value.checked_mul(sample_rate as u128).ok_or_else(overflow)? / scale;
    u64::try_from(samples).map(Some).map_err(|_| overflow())
}
