//! Per-source orchestration
//!
//! An [`Orchestrator`] drives one source through its listing:
//! - resolve the enumeration keys (fixed letters or pages read from an index)
//! - walk the list pages of each key until one comes back empty
//! - fetch, extract and persist every candidate in document order
//!
//! Work inside one source is sequential. A failure on one candidate is logged
//! and skipped; only a failed page discovery or a fatal store error ends the
//! run early.

use crate::crawler::Fetcher;
use crate::sources::{Candidate, Enumeration, EnumerationKey, Source};
use crate::storage::{
    PersistResult, PersistenceGateway, ScrapedItem, SourceTables, Storage, StoreHandle,
    UpsertAction, UpsertOutcome,
};
use crate::{ExtractionError, ScrapeError};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;

/// Counters for one source run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// List pages that produced candidates
    pub pages: u64,
    /// Candidates found on those pages
    pub candidates: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    /// Images inserted or replaced
    pub images_stored: u64,
    /// List pages and candidates that were skipped after an error
    pub failures: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome.action {
            UpsertAction::Created => self.created += 1,
            UpsertAction::Updated => self.updated += 1,
            UpsertAction::Unchanged => self.unchanged += 1,
        }
        if outcome.image_stored {
            self.images_stored += 1;
        }
    }
}

/// Runs one source to completion
pub struct Orchestrator {
    source: Arc<dyn Source>,
    fetcher: Fetcher,
    gateway: PersistenceGateway,
    max_pages_per_key: u32,
}

impl Orchestrator {
    /// Creates an orchestrator and reconciles the source's tables
    ///
    /// # Arguments
    ///
    /// * `source` - Extraction rules of the site
    /// * `fetcher` - Fetcher shared with the source's image downloads
    /// * `store` - Store handle owned by the process
    /// * `max_pages_per_key` - Ceiling on list pages walked for one key
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run
    /// * `Err(PersistError)` - The schema could not be created
    pub fn new(
        source: Arc<dyn Source>,
        fetcher: Fetcher,
        store: StoreHandle,
        max_pages_per_key: u32,
    ) -> PersistResult<Self> {
        let tables = SourceTables::for_source(source.name())?;
        store.with(|s| s.initialize_source(&tables))?;

        let gateway = PersistenceGateway::new(store, fetcher.clone(), tables);

        Ok(Self {
            source,
            fetcher,
            gateway,
            max_pages_per_key,
        })
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Walks every enumeration key of the source
    ///
    /// Returns an error only when enumeration cannot start or the store
    /// becomes unusable; everything else is counted in the summary.
    pub async fn run(&self) -> Result<RunSummary, ScrapeError> {
        let source = self.source_name();
        let started = Instant::now();
        tracing::info!(source, "starting source run");

        let keys = self.enumeration_keys().await?;
        tracing::info!(source, keys = keys.len(), "enumeration resolved");

        let mut summary = RunSummary::default();
        for key in &keys {
            self.walk_key(key, &mut summary).await?;
        }

        tracing::info!(
            source,
            pages = summary.pages,
            candidates = summary.candidates,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            images = summary.images_stored,
            failures = summary.failures,
            elapsed = ?started.elapsed(),
            "source run finished"
        );

        Ok(summary)
    }

    /// Resolves the keys to walk; a discovery failure aborts the run
    async fn enumeration_keys(&self) -> Result<Vec<EnumerationKey>, ScrapeError> {
        match self.source.enumeration() {
            Enumeration::Letters(letters) => {
                Ok(letters.into_iter().map(EnumerationKey::Letter).collect())
            }
            Enumeration::DiscoveredPages { index_url } => {
                let body = self.fetcher.fetch(&index_url).await.map_err(|e| {
                    tracing::error!(source = self.source_name(), error = %e, "page discovery failed");
                    e
                })?;
                let pages = self.source.page_numbers(&body).map_err(|e| {
                    tracing::error!(source = self.source_name(), error = %e, "page discovery failed");
                    e
                })?;
                Ok(pages.into_iter().map(EnumerationKey::Page).collect())
            }
        }
    }

    /// List pages visited for a key
    ///
    /// A letter is walked from page 1 up to the ceiling; a discovered page
    /// stands for itself.
    fn page_range(&self, key: &EnumerationKey) -> RangeInclusive<u32> {
        match key {
            EnumerationKey::Letter(_) => 1..=self.max_pages_per_key,
            EnumerationKey::Page(page) => *page..=*page,
        }
    }

    async fn walk_key(&self, key: &EnumerationKey, summary: &mut RunSummary) -> Result<(), ScrapeError> {
        let source = self.source_name();
        let range = self.page_range(key);
        let last_page = *range.end();

        for page in range {
            let candidates = match self.list_candidates(key, page).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(source, key = %key, page, error = %e, "list page failed, ending key");
                    summary.failures += 1;
                    return Ok(());
                }
            };

            if candidates.is_empty() {
                tracing::debug!(source, key = %key, page, "no candidates, key exhausted");
                return Ok(());
            }

            summary.pages += 1;
            summary.candidates += candidates.len() as u64;

            for candidate in &candidates {
                match self.process_candidate(candidate).await {
                    Ok(outcome) => summary.record(&outcome),
                    Err(ScrapeError::Persist(e)) if e.is_fatal() => {
                        tracing::error!(
                            source,
                            key = %key,
                            page,
                            candidate = %candidate.source_item_id,
                            error = %e,
                            "store unavailable, aborting source run"
                        );
                        return Err(ScrapeError::Persist(e));
                    }
                    Err(e) => {
                        tracing::warn!(
                            source,
                            key = %key,
                            page,
                            candidate = %candidate.source_item_id,
                            error = %e,
                            "skipping candidate"
                        );
                        summary.failures += 1;
                    }
                }
            }

            tracing::info!(source, key = %key, page, candidates = candidates.len(), "page processed");

            if key.is_paginated() && page == last_page {
                tracing::warn!(source, key = %key, page, "page ceiling reached, ending key");
            }
        }

        Ok(())
    }

    async fn list_candidates(&self, key: &EnumerationKey, page: u32) -> Result<Vec<Candidate>, ScrapeError> {
        let url = self.source.list_url(key, page);
        let body = self.fetcher.fetch(&url).await?;
        Ok(self.source.list_page(&body)?)
    }

    /// Fetches one detail page and hands the result to the gateway
    async fn process_candidate(&self, candidate: &Candidate) -> Result<UpsertOutcome, ScrapeError> {
        let body = self.fetcher.fetch(&candidate.detail_url).await?;
        let detail = self.source.detail_page(&body)?;

        if detail.tokens.is_empty() {
            return Err(ExtractionError::MissingNode {
                selector: format!("{} detail fields", self.source_name()),
            }
            .into());
        }

        let item = ScrapedItem::new(candidate.source_item_id.clone(), detail.tokens);
        let outcome = self.gateway.upsert(&item, detail.image_url.as_deref()).await?;
        Ok(outcome)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("source", &self.source_name())
            .field("tables", self.gateway.tables())
            .field("max_pages_per_key", &self.max_pages_per_key)
            .finish()
    }
}
