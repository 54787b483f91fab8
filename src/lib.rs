//! Missing-persons ingestion pipeline
//!
//! This crate scrapes missing-person listings from public government websites,
//! turns every entry into an ordered token list plus a content fingerprint, and
//! stores it (with an optional photograph) in SQLite. Runs are idempotent so the
//! binary can be scheduled periodically.

pub mod config;
pub mod crawler;
pub mod fingerprint;
pub mod output;
pub mod sources;
pub mod storage;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Persistence error: {0}")]
    Persist(#[from] storage::PersistError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source worker '{source_name}' did not complete: {message}")]
    Worker {
        source_name: String,
        message: String,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// A single failed HTTP attempt
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Terminal failure of the resilient fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Malformed request URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Fetching {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: usize,
        #[source]
        last: FetchFailure,
    },
}

impl FetchError {
    /// The URL the failed request was aimed at
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url, .. } | Self::Exhausted { url, .. } => url,
        }
    }
}

/// Errors raised while pulling structured data out of a page
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Required node '{selector}' is missing")]
    MissingNode { selector: String },

    #[error("Node matched by '{selector}' starts with a <{tag}> element instead of text")]
    NonTextNode { selector: String, tag: String },

    #[error("Link '{href}' could not be resolved")]
    InvalidLink { href: String },
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Fetcher, Orchestrator, RunSummary};
pub use fingerprint::fingerprint;
pub use storage::{PersistenceGateway, SqliteStorage, StoreHandle};
