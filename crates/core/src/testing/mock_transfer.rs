//! Mock fetcher and publisher for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transfer::{FetchError, Fetcher, PublishError, Publisher};

use super::fixtures::SOURCE_BYTES;

/// Mock implementation of the Fetcher trait.
///
/// Writes a fixed body to the destination and records every URL.
#[derive(Debug)]
pub struct MockFetcher {
    body: Arc<RwLock<Vec<u8>>>,
    fetched: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<FetchError>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            body: Arc::new(RwLock::new(SOURCE_BYTES.to_vec())),
            fetched: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the body written by subsequent fetches.
    pub async fn set_body(&self, body: impl Into<Vec<u8>>) {
        *self.body.write().await = body.into();
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// URLs fetched so far.
    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        self.fetched.write().await.push(url.to_string());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let body = self.body.read().await.clone();
        tokio::fs::write(dest, &body)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
        Ok(body.len() as u64)
    }
}

/// An upload recorded by [`MockPublisher`].
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub url: String,
    pub body: Vec<u8>,
}

/// Mock implementation of the Publisher trait.
///
/// Reads the staged file fully so tests can assert on what was uploaded.
#[derive(Debug)]
pub struct MockPublisher {
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    next_error: Arc<RwLock<Option<PublishError>>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Configure the next publish to fail with the given error.
    pub async fn set_next_error(&self, error: PublishError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.len()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, source: &Path, url: &str) -> Result<u64, PublishError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let body = tokio::fs::read(source)
            .await
            .map_err(|e| PublishError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;
        let size = body.len() as u64;

        self.uploads.write().await.push(RecordedUpload {
            url: url.to_string(),
            body,
        });
        Ok(size)
    }
}
