//! Storage module for persisting scraped records
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and per-source schema reconciliation
//! - The fingerprint-keyed create-or-update transaction
//! - Image blobs owned by records
//! - Count queries for run statistics

mod gateway;
mod schema;
mod sqlite;
mod traits;

pub use gateway::{image_extension, DownloadedImage, ImageUnavailable, PersistenceGateway};
pub use schema::initialize_source_schema;
pub use sqlite::SqliteStorage;
pub use traits::{PersistError, PersistResult, Storage};

use std::sync::{Arc, Mutex};

/// One persisted missing-person entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub source_item_id: String,
    pub fingerprint: String,
    pub tokens: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Photograph owned by a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: i64,
    pub owner_record_id: i64,
    pub extension: String,
    pub blob: Vec<u8>,
}

/// A detail page reduced to what the store needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedItem {
    pub source_item_id: String,
    pub tokens: Vec<String>,
    pub fingerprint: String,
}

impl ScrapedItem {
    /// Builds an item, deriving the fingerprint from the tokens
    pub fn new(source_item_id: impl Into<String>, tokens: Vec<String>) -> Self {
        let fingerprint = crate::fingerprint::fingerprint(&tokens);
        Self {
            source_item_id: source_item_id.into(),
            tokens,
            fingerprint,
        }
    }
}

/// Table names for one source's namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTables {
    pub source: String,
    pub records: String,
    pub images: String,
}

impl SourceTables {
    /// Derives `<source>_scrapped` and `<source>_images`
    ///
    /// Names are interpolated into SQL, so only `[a-z0-9_]` is accepted.
    pub fn for_source(source: &str) -> PersistResult<Self> {
        let valid = !source.is_empty()
            && source
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(PersistError::InvalidSourceName(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            records: format!("{}_scrapped", source),
            images: format!("{}_images", source),
        })
    }
}

/// What the store already holds for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existing {
    /// Neither the fingerprint nor the site id is known
    Missing,
    /// Same fingerprint: content unchanged since the last run
    SameContent { record_id: i64, has_image: bool },
    /// Same site id under a different fingerprint: content changed
    ChangedContent { record_id: i64 },
}

impl Existing {
    /// Whether an image download could change the store
    pub fn wants_image(&self) -> bool {
        !matches!(
            self,
            Self::SameContent {
                has_image: true,
                ..
            }
        )
    }
}

/// Which branch an upsert took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
    Unchanged,
}

/// Result of one create-or-update transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub record_id: i64,
    pub action: UpsertAction,
    /// An image row was inserted or replaced
    pub image_stored: bool,
}

/// Shared, explicitly passed store handle
///
/// Clones refer to the same connection. The lock is taken for the duration
/// of one synchronous store call and never held across an `.await`.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<SqliteStorage>>,
}

impl StoreHandle {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Runs `f` with exclusive access to the store
    pub fn with<T, F>(&self, f: F) -> PersistResult<T>
    where
        F: FnOnce(&mut SqliteStorage) -> PersistResult<T>,
    {
        let mut storage = self
            .inner
            .lock()
            .map_err(|_| PersistError::StoreUnavailable("store lock poisoned".to_string()))?;
        f(&mut storage)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
