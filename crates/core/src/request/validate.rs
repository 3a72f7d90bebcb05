//! Intake validation shared by every submission path.

use thiserror::Error;

use super::allow_list::DomainAllowList;
use super::types::{
    AudioFormat, BitDepth, ConversionRequest, Delivery, RawConversionRequest,
    ALLOWED_SAMPLE_RATES, MP3_BIT_RATE,
};
use crate::transcoder::CodecSelection;

/// How the produced file is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
    /// Queued job, output uploaded to `output_url`, outcome sent to `notify_url`.
    Push,
    /// Synchronous conversion streamed back in the response.
    Direct,
}

/// A request field that failed intake validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Input format is not valid")]
    InputFormat,
    #[error("Input URL is not valid")]
    InputUrl,
    #[error("Input name is not valid")]
    InputName,
    #[error("Output format is not valid")]
    OutputFormat,
    #[error("Output codec is not valid")]
    OutputCodec,
    #[error("Output channel mode is not valid")]
    OutputChannels,
    #[error("Output sample rate is not valid")]
    OutputSampleRate,
    #[error("Output bit depth is not valid")]
    OutputBitDepth,
    #[error("Output bit rate is not valid")]
    OutputBitRate,
    #[error("Output dither is not valid")]
    OutputDither,
    #[error("Output name is not valid")]
    OutputName,
    #[error("Output URL is not valid")]
    OutputUrl,
    #[error("Output URL is not allowed for direct-stream conversions")]
    UnexpectedOutputUrl,
    #[error("Notify URL is not valid")]
    NotifyUrl,
    #[error("Malformed request body: {0}")]
    Malformed(String),
}

/// Validates a raw submission and turns it into a [`ConversionRequest`].
///
/// Checks run in a fixed order and the first failing field is reported.
pub fn validate_request(
    raw: RawConversionRequest,
    allow_list: &DomainAllowList,
    mode: IntakeMode,
) -> Result<ConversionRequest, ValidationError> {
    let input_format = raw
        .input_format
        .as_deref()
        .and_then(AudioFormat::parse)
        .ok_or(ValidationError::InputFormat)?;

    let input_url = raw
        .input_url
        .filter(|url| allow_list.is_url_allowed(url))
        .ok_or(ValidationError::InputUrl)?;

    let input_name = non_empty(raw.input_name, ValidationError::InputName)?;
    let output_name = non_empty(raw.output_name, ValidationError::OutputName)?;
    if mode == IntakeMode::Direct && input_name.is_none() && output_name.is_none() {
        return Err(ValidationError::InputName);
    }

    let output_format = raw
        .output_format
        .as_deref()
        .and_then(AudioFormat::parse)
        .ok_or(ValidationError::OutputFormat)?;

    let output_channels = match raw.output_channels {
        Some(c @ (1 | 2)) => c as u8,
        _ => return Err(ValidationError::OutputChannels),
    };

    let output_sample_rate = raw
        .output_sample_rate
        .and_then(|r| u32::try_from(r).ok())
        .filter(|r| ALLOWED_SAMPLE_RATES.contains(r))
        .ok_or(ValidationError::OutputSampleRate)?;

    let (output_bit_depth, output_bit_rate) = if output_format.is_lossy() {
        let bit_rate = raw
            .output_bit_rate
            .map(|b| b.normalized())
            .filter(|b| b == MP3_BIT_RATE)
            .ok_or(ValidationError::OutputBitRate)?;
        (None, Some(bit_rate))
    } else {
        let depth = raw
            .output_bit_depth
            .and_then(|d| u8::try_from(d).ok())
            .and_then(|d| BitDepth::try_from(d).ok())
            .ok_or(ValidationError::OutputBitDepth)?;
        (Some(depth), None)
    };

    let output_dither = raw
        .output_dither
        .as_ref()
        .and_then(serde_json::Value::as_bool)
        .ok_or(ValidationError::OutputDither)?;

    let output_codec = non_empty(raw.output_codec, ValidationError::OutputCodec)?;
    if let Some(codec) = &output_codec {
        let selection = CodecSelection::for_output(output_format, output_bit_depth);
        if !selection.accepts_hint(codec, output_format) {
            return Err(ValidationError::OutputCodec);
        }
    }

    let delivery = match (mode, raw.output_url) {
        (IntakeMode::Push, Some(url)) if allow_list.is_url_allowed(&url) => Delivery::Push {
            output_url: url,
        },
        (IntakeMode::Push, _) => return Err(ValidationError::OutputUrl),
        (IntakeMode::Direct, None) => Delivery::Direct,
        (IntakeMode::Direct, Some(_)) => return Err(ValidationError::UnexpectedOutputUrl),
    };

    let notify_url = match (mode, raw.notify_url) {
        (_, Some(url)) if allow_list.is_url_allowed(&url) => Some(url),
        (_, Some(_)) | (IntakeMode::Push, None) => return Err(ValidationError::NotifyUrl),
        (IntakeMode::Direct, None) => None,
    };

    Ok(ConversionRequest {
        input_url,
        input_format,
        input_name,
        output_format,
        output_codec,
        output_channels,
        output_sample_rate,
        output_bit_depth,
        output_bit_rate,
        output_dither,
        output_name,
        delivery,
        notify_url,
        context: raw.context,
    })
}

/// `None` stays `None`, blank strings are rejected with `err`.
fn non_empty(
    value: Option<String>,
    err: ValidationError,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(err),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
