use crate::config::types::{Config, FetcherConfig, SourceEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    validate_fetcher_config(&config.fetcher)?;

    if config.pipeline.max_pages_per_key < 1 {
        return Err(ConfigError::Validation(
            "max-pages-per-key must be >= 1".to_string(),
        ));
    }

    validate_source("croatia", &config.sources.croatia)?;
    validate_source("romania", &config.sources.romania)?;

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.backoff_schedule_ms.is_empty() {
        return Err(ConfigError::Validation(
            "backoff-schedule-ms must contain at least one delay".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Base URLs are checked even for disabled sources
fn validate_source(name: &str, entry: &SourceEntry) -> Result<(), ConfigError> {
    let url = Url::parse(&entry.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("{} base-url '{}': {}", name, entry.base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} base-url '{}' must use http or https",
            name, entry.base_url
        )));
    }

    Ok(())
}
