//! HTTP implementation of fetch and publish.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::error::{FetchError, PublishError};
use super::stream::{open_file_stream, stream_to_file, StreamCopyError};
use crate::config::HttpConfig;

/// Downloads a remote source into a staged file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Streams `url` into `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Uploads a produced file to its destination.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Streams `source` to `url` with an HTTP PUT, returning the bytes sent.
    async fn publish(&self, source: &Path, url: &str) -> Result<u64, PublishError>;
}

/// `reqwest` backed [`Fetcher`] and [`Publisher`].
#[derive(Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpTransfer {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        debug!(url = %url, dest = %dest.display(), "Fetching source");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = stream_to_file(response.bytes_stream(), dest)
            .await
            .map_err(|e| match e {
                StreamCopyError::Source(e) => FetchError::from(e),
                StreamCopyError::Io(source) => FetchError::Io {
                    path: dest.to_path_buf(),
                    source,
                },
            })?;

        info!(url = %url, bytes, "Fetched source");
        Ok(bytes)
    }
}

#[async_trait]
impl Publisher for HttpTransfer {
    async fn publish(&self, source: &Path, url: &str) -> Result<u64, PublishError> {
        let (size, stream) = open_file_stream(source)
            .await
            .map_err(|e| PublishError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;

        debug!(url = %url, bytes = size, "Publishing output");
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status {
                status: status.as_u16(),
            });
        }

        info!(url = %url, bytes = size, "Published output");
        Ok(size)
    }
}
