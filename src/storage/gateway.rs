//! Persistence gateway
//!
//! Couples the store with the fetcher for the one piece of network I/O the
//! persistence step needs: the record's photograph. Image failures are never
//! fatal; the record is committed without an image and a later run fills it
//! in.

use crate::crawler::Fetcher;
use crate::storage::traits::{PersistResult, Storage};
use crate::storage::{ScrapedItem, SourceTables, StoreHandle, UpsertOutcome};
use crate::FetchError;
use thiserror::Error;
use url::Url;

/// Image bytes ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub extension: String,
    pub blob: Vec<u8>,
}

/// Why a record's image could not be obtained on this run
#[derive(Debug, Error)]
pub enum ImageUnavailable {
    #[error("cannot derive an image extension from {url}")]
    NoExtension { url: String },

    #[error("image download failed: {0}")]
    Download(#[from] FetchError),
}

/// Extension from the final path segment of an image URL
///
/// `https://x/img/p1.JPG?v=2` gives `JPG`; a segment without a dot gives None.
pub fn image_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_string())
}

/// Downloads an image through the resilient fetcher
pub async fn fetch_image(fetcher: &Fetcher, url: &str) -> Result<DownloadedImage, ImageUnavailable> {
    let extension = image_extension(url).ok_or_else(|| ImageUnavailable::NoExtension {
        url: url.to_string(),
    })?;
    let blob = fetcher.fetch(url).await?;
    Ok(DownloadedImage { extension, blob })
}

/// Idempotent create-or-update of records for one source
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    store: StoreHandle,
    fetcher: Fetcher,
    tables: SourceTables,
}

impl PersistenceGateway {
    pub fn new(store: StoreHandle, fetcher: Fetcher, tables: SourceTables) -> Self {
        Self {
            store,
            fetcher,
            tables,
        }
    }

    pub fn tables(&self) -> &SourceTables {
        &self.tables
    }

    /// Creates or updates one item and its image
    ///
    /// The image is downloaded before the transaction opens, and only when
    /// the store could use it: an unchanged record that already owns an image
    /// costs no network request. The transaction itself re-runs the lookup
    /// and branches on that result.
    pub async fn upsert(
        &self,
        item: &ScrapedItem,
        image_url: Option<&str>,
    ) -> PersistResult<UpsertOutcome> {
        let existing = self
            .store
            .with(|s| s.lookup(&self.tables, &item.fingerprint, &item.source_item_id))?;

        let image = match image_url {
            Some(url) if existing.wants_image() => self.download_image(item, url).await,
            Some(_) => None,
            None => {
                tracing::debug!(
                    source = %self.tables.source,
                    candidate = %item.source_item_id,
                    "no image on detail page"
                );
                None
            }
        };

        let outcome = self
            .store
            .with(|s| s.upsert(&self.tables, item, image.as_ref()))?;

        tracing::debug!(
            source = %self.tables.source,
            candidate = %item.source_item_id,
            record_id = outcome.record_id,
            action = ?outcome.action,
            image_stored = outcome.image_stored,
            "record persisted"
        );

        Ok(outcome)
    }

    async fn download_image(&self, item: &ScrapedItem, url: &str) -> Option<DownloadedImage> {
        match fetch_image(&self.fetcher, url).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(
                    source = %self.tables.source,
                    candidate = %item.source_item_id,
                    url,
                    error = %e,
                    "image unavailable, record kept without it"
                );
                None
            }
        }
    }
}
