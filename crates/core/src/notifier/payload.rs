//! Notification body delivered to `notify_url`.

use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::inspector::MediaMetadata;

/// Plain structured form of an error, safe to send over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<SerializedError>>,
}

impl SerializedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Serializes `err` and its `source()` chain. Causes get the kind `source`.
    pub fn from_error(kind: impl Into<String>, err: &(dyn Error + 'static)) -> Self {
        Self {
            kind: kind.into(),
            message: err.to_string(),
            cause: err
                .source()
                .map(|source| Box::new(Self::from_error("source", source))),
        }
    }
}

/// `{id, context, meta, err}`; exactly one of `meta` and `err` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: String,
    pub context: serde_json::Value,
    pub meta: Option<MediaMetadata>,
    pub err: Option<SerializedError>,
}

impl NotificationPayload {
    pub fn success(id: impl Into<String>, context: serde_json::Value, meta: MediaMetadata) -> Self {
        Self {
            id: id.into(),
            context,
            meta: Some(meta),
            err: None,
        }
    }

    pub fn failure(id: impl Into<String>, context: serde_json::Value, err: SerializedError) -> Self {
        Self {
            id: id.into(),
            context,
            meta: None,
            err: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.meta.is_some()
    }
}
