//! Transcoding module.
//!
//! Builds deterministic ffmpeg argument lists for a validated
//! [`ConversionRequest`](crate::request::ConversionRequest) and runs them
//! through a [`Transcoder`].
//!
//! # Example
//!
//! ```rust,ignore
//! use soundshift_core::transcoder::{build_args, FfmpegTranscoder, Transcoder, ConverterConfig};
//!
//! let transcoder = FfmpegTranscoder::new(ConverterConfig::default());
//! let args = build_args(&request, Some(44_100), input.path(), output.path());
//! transcoder.run(&args).await?;
//! ```

mod command;
mod config;
mod error;
mod ffmpeg;
mod traits;

pub use command::{
    build_args, build_filter, output_file_name, output_name, CodecSelection, DitherMethod,
    RESAMPLER_PRECISION,
};
pub use config::ConverterConfig;
pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::{ExecResult, Transcoder};
