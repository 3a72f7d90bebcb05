use super::{types::Config, ConfigError};
use crate::request::DomainAllowList;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker concurrency, queue attempts and record retention are positive
/// - Timeouts are positive
/// - Every domain pattern compiles
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.worker.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "worker.concurrency must be at least 1".to_string(),
        ));
    }

    if config.queue.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "queue.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.queue.max_finished_records == 0 {
        return Err(ConfigError::ValidationError(
            "queue.max_finished_records must be at least 1".to_string(),
        ));
    }

    let timeouts = [
        ("converter.timeout_secs", config.converter.timeout_secs),
        ("converter.probe_timeout_secs", config.converter.probe_timeout_secs),
        ("http.connect_timeout_secs", config.http.connect_timeout_secs),
        ("http.read_timeout_secs", config.http.read_timeout_secs),
        ("http.notify_timeout_secs", config.http.notify_timeout_secs),
        ("queue.finished_retention_secs", config.queue.finished_retention_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be 0",
                name
            )));
        }
    }

    DomainAllowList::new(&config.urls.valid_domains)
        .map_err(|e| ConfigError::ValidationError(format!("urls.valid_domains: {}", e)))?;

    Ok(())
}
