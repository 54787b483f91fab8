use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Overrides `[database] path`
pub const ENV_DATABASE: &str = "MISSING_PERSONS_DATABASE";
/// Overrides `[sources.croatia] base-url`
pub const ENV_CROATIA_URL: &str = "MISSING_PERSONS_CROATIA_URL";
/// Overrides `[sources.romania] base-url`
pub const ENV_ROMANIA_URL: &str = "MISSING_PERSONS_ROMANIA_URL";

/// Loads the configuration, applies environment overrides and validates it
///
/// # Arguments
///
/// * `path` - Optional TOML file; built-in defaults are used when `None`
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Parses TOML content without touching the environment
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies overrides from a variable lookup (normally `std::env::var`)
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(path) = get(ENV_DATABASE) {
        config.database.path = path;
    }
    if let Some(url) = get(ENV_CROATIA_URL) {
        config.sources.croatia.base_url = url;
    }
    if let Some(url) = get(ENV_ROMANIA_URL) {
        config.sources.romania.base_url = url;
    }
}
