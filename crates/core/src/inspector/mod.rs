//! Media inspection.
//!
//! Probes staged files with ffprobe into [`MediaMetadata`] and applies the
//! acceptance policy used for both the source and the converted file.

mod error;
mod ffprobe;
mod policy;
mod types;

pub use error::InspectError;
pub use ffprobe::{duration_in_samples, parse_probe_output, FfprobeInspector, MediaProber};
pub use policy::{check_media, ALLOWED_CODECS, ALLOWED_FORMATS, MAX_CHANNELS};
pub use types::MediaMetadata;
