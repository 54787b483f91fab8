//! Configuration module
//!
//! Settings come from an optional TOML file, then environment overrides, then
//! validation. Every key has a default that targets the production sites.
//!
//! # Example
//!
//! ```no_run
//! use missing_persons::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("config.toml"))).unwrap();
//! println!("Store: {}", config.database.path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DatabaseConfig, FetcherConfig, PipelineConfig, SourceEntry, SourcesConfig,
    CROATIA_BASE_URL, ROMANIA_BASE_URL,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, load_config, parse_config, ENV_CROATIA_URL, ENV_DATABASE,
    ENV_ROMANIA_URL,
};
pub use validation::validate;
