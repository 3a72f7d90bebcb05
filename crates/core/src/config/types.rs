use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::transcoder::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub urls: UrlPolicyConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

/// Queue backends
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    #[default]
    Memory,
}

/// Job queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,
    /// Connection target for an external broker (e.g. "redis://localhost:6379").
    #[serde(default)]
    pub url: Option<String>,
    /// Delivery ceiling per job, first attempt included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seconds a completed or failed job stays queryable.
    #[serde(default = "default_finished_retention_secs")]
    pub finished_retention_secs: u64,
    /// Upper bound on completed and failed records kept.
    #[serde(default = "default_max_finished_records")]
    pub max_finished_records: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            url: None,
            max_attempts: default_max_attempts(),
            finished_retention_secs: default_finished_retention_secs(),
            max_finished_records: default_max_finished_records(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_finished_retention_secs() -> u64 {
    3600
}

fn default_max_finished_records() -> usize {
    10_000
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Number of jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    10
}

/// Outbound HTTP timeouts (fetch, publish, webhook)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum idle time between two reads of a transfer body.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total timeout for a webhook call.
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            notify_timeout_secs: default_notify_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    300
}

fn default_notify_timeout() -> u64 {
    30
}

/// URL policy for client supplied locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlPolicyConfig {
    /// Wildcard host patterns accepted for input, output and notify URLs.
    #[serde(default = "default_valid_domains")]
    pub valid_domains: Vec<String>,
}

impl Default for UrlPolicyConfig {
    fn default() -> Self {
        Self {
            valid_domains: default_valid_domains(),
        }
    }
}

fn default_valid_domains() -> Vec<String> {
    vec!["*".to_string()]
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub queue: SanitizedQueueConfig,
    pub worker: WorkerConfig,
    pub http: HttpConfig,
    pub urls: UrlPolicyConfig,
    pub converter_timeout_secs: u64,
}

/// Sanitized queue config (broker credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQueueConfig {
    pub backend: QueueBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub max_attempts: u32,
    pub finished_retention_secs: u64,
    pub max_finished_records: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            queue: SanitizedQueueConfig {
                backend: config.queue.backend.clone(),
                url: config.queue.url.as_deref().map(redact_url),
                max_attempts: config.queue.max_attempts,
                finished_retention_secs: config.queue.finished_retention_secs,
                max_finished_records: config.queue.max_finished_records,
            },
            worker: config.worker.clone(),
            http: config.http.clone(),
            urls: config.urls.clone(),
            converter_timeout_secs: config.converter.timeout_secs,
        }
    }
}

/// Hides the userinfo part of a connection URL.
fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}
