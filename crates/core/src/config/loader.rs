use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(base().merge(Toml::file(path)))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    extract(base())
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn base() -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    with_env(figment)
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Layers environment overrides on top of `figment`.
///
/// `SOUNDSHIFT_SECTION__KEY` addresses nested keys. The plain `PORT`,
/// `CONCURRENCY`, `REDIS_URL` and `VALID_URL_DOMAINS` variables win over
/// everything else so existing deployments keep working.
fn with_env(figment: Figment) -> Figment {
    let mut figment = figment
        .merge(Env::prefixed("SOUNDSHIFT_").split("__"))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
        .merge(
            Env::raw()
                .only(&["CONCURRENCY"])
                .map(|_| "worker.concurrency".into()),
        )
        .merge(Env::raw().only(&["REDIS_URL"]).map(|_| "queue.url".into()));

    if let Ok(domains) = std::env::var("VALID_URL_DOMAINS") {
        figment = figment.merge(Serialized::default(
            "urls.valid_domains",
            split_domains(&domains),
        ));
    }

    figment
}

fn split_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
