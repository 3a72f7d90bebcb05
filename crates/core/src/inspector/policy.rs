//! Acceptance policy applied to both the source and the produced file.

use super::error::InspectError;
use super::types::MediaMetadata;

/// Container formats a staged file may have.
pub const ALLOWED_FORMATS: [&str; 3] = ["flac", "wav", "mp3"];

/// Codecs a staged file may use.
pub const ALLOWED_CODECS: [&str; 7] = [
    "flac",
    "pcm_s16le",
    "pcm_s16be",
    "pcm_s24le",
    "pcm_s32le",
    "pcm_f32le",
    "mp3",
];

/// Maximum number of channels.
pub const MAX_CHANNELS: u32 = 2;

/// Checks `meta` against the channel, format and codec allow-lists, in that order.
pub fn check_media(meta: &MediaMetadata) -> Result<(), InspectError> {
    if meta.channels > MAX_CHANNELS {
        return Err(InspectError::TooManyChannels {
            channels: meta.channels,
        });
    }

    if !ALLOWED_FORMATS.contains(&meta.format_name.as_str()) {
        return Err(InspectError::BadFormat {
            format: meta.format_name.clone(),
        });
    }

    if !ALLOWED_CODECS.contains(&meta.codec_name.as_str()) {
        return Err(InspectError::BadCodec {
            codec: meta.codec_name.clone(),
        });
    }

    Ok(())
}
