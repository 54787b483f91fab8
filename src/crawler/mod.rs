//! Crawler module for fetching and processing listing pages
//!
//! This module contains the core pipeline logic, including:
//! - HTTP fetching with retry logic
//! - HTML helpers shared by the source extractors
//! - Per-source orchestration
//! - Concurrent fan-out over sources

mod coordinator;
mod fetcher;
pub mod parser;
mod runner;

pub use coordinator::{Orchestrator, RunSummary};
pub use fetcher::{build_http_client, Fetcher, DEFAULT_BACKOFF};
pub use runner::{run_sources, SourceReport};

use crate::config::Config;
use crate::sources::{build_sources, Source};
use crate::storage::StoreHandle;
use crate::ScrapeError;
use std::sync::Arc;

/// Builds one orchestrator per source over a shared store handle
///
/// # Arguments
///
/// * `config` - The pipeline configuration
/// * `store` - Store handle owned by the caller
/// * `sources` - Sources to run
///
/// # Returns
///
/// * `Ok(Vec<Orchestrator>)` - Orchestrators with their tables reconciled
/// * `Err(ScrapeError)` - The HTTP client or a schema could not be set up
pub fn build_orchestrators(
    config: &Config,
    store: &StoreHandle,
    sources: Vec<Arc<dyn Source>>,
) -> Result<Vec<Orchestrator>, ScrapeError> {
    let fetcher = Fetcher::from_config(&config.fetcher)?;

    sources
        .into_iter()
        .map(|source| {
            Orchestrator::new(
                source,
                fetcher.clone(),
                store.clone(),
                config.pipeline.max_pages_per_key,
            )
            .map_err(ScrapeError::from)
        })
        .collect()
}

/// Runs every enabled source against the store
///
/// `only` restricts the run to the named sources; an empty slice runs all
/// enabled ones.
///
/// # Returns
///
/// * `Ok(Vec<SourceReport>)` - One report per source that was started
/// * `Err(ScrapeError)` - Setup failed before any source ran
pub async fn crawl(
    config: &Config,
    store: &StoreHandle,
    only: &[String],
) -> Result<Vec<SourceReport>, ScrapeError> {
    let mut sources = build_sources(&config.sources)?;
    if !only.is_empty() {
        sources.retain(|source| only.iter().any(|name| name == source.name()));
    }

    if sources.is_empty() {
        tracing::warn!("no sources selected");
        return Ok(Vec::new());
    }

    tracing::info!(
        sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "starting pipeline"
    );

    let orchestrators = build_orchestrators(config, store, sources)?;
    Ok(run_sources(orchestrators).await)
}
