//! Mock notifier for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notifier::{NotificationPayload, Notifier, NotifyError};

/// A notification recorded by [`MockNotifier`].
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    pub url: String,
    pub payload: NotificationPayload,
}

/// Mock implementation of the Notifier trait.
///
/// Records every attempted delivery, including ones configured to fail.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<RecordedNotification>>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail with a 500 status.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn notifications(&self) -> Vec<RecordedNotification> {
        self.sent.read().await.clone()
    }

    /// Notifications recorded for one job id.
    pub async fn notifications_for(&self, id: &str) -> Vec<RecordedNotification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.payload.id == id)
            .cloned()
            .collect()
    }

    pub async fn notification_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError> {
        self.sent.write().await.push(RecordedNotification {
            url: url.to_string(),
            payload: payload.clone(),
        });

        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status { status: 500 });
        }
        Ok(())
    }
}
