//! Pure construction of ffmpeg argument lists.
//!
//! Nothing here touches the filesystem or spawns processes. Arguments are
//! returned as a list and handed to the subprocess as-is, never through a
//! shell, so client supplied names and URLs cannot inject commands.

use std::path::Path;

use crate::request::{AudioFormat, BitDepth, ConversionRequest};

/// Internal precision of the soxr resampler, in bits.
pub const RESAMPLER_PRECISION: u8 = 28;

/// Encoder and encoder flags derived from the requested output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSelection {
    /// Value of `-c:a`.
    pub codec: &'static str,
    /// Value of `-sample_fmt`, when the encoder needs one.
    pub sample_fmt: Option<&'static str>,
    /// Value of `-b:a`, for lossy output.
    pub bit_rate: Option<&'static str>,
}

impl CodecSelection {
    /// Maps an output format and depth to the encoder used for it.
    ///
    /// Lossless formats without a depth fall back to 16-bit.
    pub fn for_output(format: AudioFormat, bit_depth: Option<BitDepth>) -> Self {
        let depth = bit_depth.unwrap_or(BitDepth::Sixteen);
        match format {
            AudioFormat::Wav => Self {
                codec: match depth {
                    BitDepth::Sixteen => "pcm_s16le",
                    BitDepth::TwentyFour => "pcm_s32le",
                },
                sample_fmt: None,
                bit_rate: None,
            },
            AudioFormat::Flac => Self {
                codec: "flac",
                sample_fmt: Some(match depth {
                    BitDepth::Sixteen => "s16",
                    BitDepth::TwentyFour => "s32",
                }),
                bit_rate: None,
            },
            AudioFormat::Mp3 => Self {
                codec: "libmp3lame",
                sample_fmt: None,
                bit_rate: Some("320k"),
            },
        }
    }

    /// Whether a client codec hint names this selection.
    ///
    /// The encoder name and the format name are both accepted, so `mp3`
    /// matches `libmp3lame`.
    pub fn accepts_hint(&self, hint: &str, format: AudioFormat) -> bool {
        hint.eq_ignore_ascii_case(self.codec) || hint.eq_ignore_ascii_case(format.extension())
    }
}

/// Dither algorithm passed to the `aresample` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherMethod {
    /// Noise-shaped dither. ffmpeg only ships shibata filters for 44.1 and 48 kHz.
    Shibata,
    /// Triangular high-pass dither, usable at any rate.
    TriangularHighPass,
}

impl DitherMethod {
    /// Shibata at 44.1/48 kHz, triangular high-pass everywhere else.
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        match sample_rate {
            44_100 | 48_000 => Self::Shibata,
            _ => Self::TriangularHighPass,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shibata => "shibata",
            Self::TriangularHighPass => "triangular_hp",
        }
    }
}

/// Builds the `-af` filter for the requested rate and dither.
///
/// Returns `None` when the source rate already matches and no dither is
/// requested. An unknown source rate is treated as different.
pub fn build_filter(
    source_rate: Option<u32>,
    target_rate: u32,
    dither: bool,
) -> Option<String> {
    let resample = source_rate != Some(target_rate);
    let dither = dither.then(|| DitherMethod::for_sample_rate(target_rate));

    let mut options = Vec::new();
    if resample {
        options.push("resampler=soxr".to_string());
        options.push(format!("precision={}", RESAMPLER_PRECISION));
    }
    if let Some(method) = dither {
        options.push(format!("dither_method={}", method.as_str()));
    }

    if options.is_empty() {
        None
    } else {
        Some(format!("aresample={}", options.join(":")))
    }
}

/// Builds the ffmpeg arguments converting `input` into `output` for `request`.
///
/// Only the first audio stream is mapped; container metadata, chapters and
/// any attached pictures are dropped.
pub fn build_args(
    request: &ConversionRequest,
    source_rate: Option<u32>,
    input: &Path,
    output: &Path,
) -> Vec<String> {
    let selection = CodecSelection::for_output(request.output_format, request.output_bit_depth);

    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-map".to_string(),
        "0:a:0".to_string(),
        "-map_metadata".to_string(),
        "-1".to_string(),
        "-map_chapters".to_string(),
        "-1".to_string(),
        "-fflags".to_string(),
        "+bitexact".to_string(),
        "-c:a".to_string(),
        selection.codec.to_string(),
    ];

    if let Some(fmt) = selection.sample_fmt {
        args.extend(["-sample_fmt".to_string(), fmt.to_string()]);
    }

    if let Some(rate) = selection.bit_rate {
        args.extend(["-b:a".to_string(), rate.to_string()]);
    }

    args.extend(["-ac".to_string(), request.output_channels.to_string()]);

    if let Some(filter) = build_filter(
        source_rate,
        request.output_sample_rate,
        request.output_dither,
    ) {
        args.extend(["-af".to_string(), filter]);
    }

    args.extend([
        "-ar".to_string(),
        request.output_sample_rate.to_string(),
        "-f".to_string(),
        request.output_format.extension().to_string(),
        output.to_string_lossy().to_string(),
    ]);

    args
}

/// Name of the produced file, without extension.
///
/// `{name}-{sample_rate}-{bit_depth or bit_rate}` with a `-dither` suffix
/// when dithering was requested. Path separators, quotes and control
/// characters in the client name are replaced by `_`.
pub fn output_name(request: &ConversionRequest) -> String {
    let base = sanitize_name(request.base_name());
    let quality = match (request.output_bit_depth, request.output_bit_rate.as_deref()) {
        (Some(depth), _) => depth.bits().to_string(),
        (None, Some(rate)) => rate.to_string(),
        (None, None) => String::new(),
    };

    let mut name = format!("{}-{}-{}", base, request.output_sample_rate, quality);
    if request.output_dither {
        name.push_str("-dither");
    }
    name
}

/// File name including the output extension, e.g. `take-48000-24.flac`.
pub fn output_file_name(request: &ConversionRequest) -> String {
    format!(
        "{}.{}",
        output_name(request),
        request.output_format.extension()
    )
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | '\'' | ':' | ';' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "output".to_string()
    } else {
        trimmed.to_string()
    }
}
