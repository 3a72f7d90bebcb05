//! Terminal job notifications.

mod payload;
mod webhook;

pub use payload::{NotificationPayload, SerializedError};
pub use webhook::{Notifier, NotifyError, WebhookNotifier};
