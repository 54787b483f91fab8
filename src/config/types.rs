use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Store location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Resilient fetcher behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Its length is the attempt count; entry `i` is the pause before retry
    /// `i + 1`, so the last entry is never slept
    #[serde(rename = "backoff-schedule-ms", default = "default_backoff")]
    pub backoff_schedule_ms: Vec<u64>,

    /// Per-request timeout
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Skip TLS certificate validation (the targets ship broken chains)
    #[serde(rename = "accept-invalid-certs", default = "default_true")]
    pub accept_invalid_certs: bool,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backoff_schedule_ms: default_backoff(),
            request_timeout_secs: default_timeout(),
            accept_invalid_certs: true,
            user_agent: default_user_agent(),
        }
    }
}

/// Enumeration limits
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Ceiling on list pages walked for a single enumeration key
    #[serde(rename = "max-pages-per-key", default = "default_max_pages")]
    pub max_pages_per_key: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages_per_key: default_max_pages(),
        }
    }
}

/// Per-source switches and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_croatia")]
    pub croatia: SourceEntry,
    #[serde(default = "default_romania")]
    pub romania: SourceEntry,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            croatia: default_croatia(),
            romania: default_romania(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Scheme and host every list, detail and image URL is built from
    #[serde(rename = "base-url")]
    pub base_url: String,
}

pub const CROATIA_BASE_URL: &str = "https://nestali.gov.hr";
pub const ROMANIA_BASE_URL: &str = "https://www.politiaromana.ro";

fn default_database_path() -> String {
    "missing_persons.db".to_string()
}

fn default_backoff() -> Vec<u64> {
    vec![1000, 3000, 10000]
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("missing-persons/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_pages() -> u32 {
    1000
}

fn default_croatia() -> SourceEntry {
    SourceEntry {
        enabled: true,
        base_url: CROATIA_BASE_URL.to_string(),
    }
}

fn default_romania() -> SourceEntry {
    SourceEntry {
        enabled: true,
        base_url: ROMANIA_BASE_URL.to_string(),
    }
}
