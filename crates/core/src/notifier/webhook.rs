//! Webhook delivery of job outcomes.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::payload::NotificationPayload;

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook responded with status {status}")]
    Status { status: u16 },

    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Delivers the terminal notification of a job.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

/// Posts the payload as JSON.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    /// Creates a notifier whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }

        debug!(url = %url, id = %payload.id, "Notification delivered");
        Ok(())
    }
}
