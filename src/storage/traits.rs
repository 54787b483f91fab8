//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    DownloadedImage, Existing, Image, Record, ScrapedItem, SourceTables, UpsertOutcome,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid source name for table prefix: '{0}'")]
    InvalidSourceName(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl PersistError {
    /// Errors after which no further writes can succeed in this process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Result type for storage operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Trait for storage backend implementations
///
/// All operations are scoped to one source's tables.
pub trait Storage {
    // ===== Schema =====

    /// Creates the source's tables if they do not exist
    fn initialize_source(&mut self, tables: &SourceTables) -> PersistResult<()>;

    // ===== Records =====

    /// Classifies an item against the store without writing
    fn lookup(
        &self,
        tables: &SourceTables,
        fingerprint: &str,
        source_item_id: &str,
    ) -> PersistResult<Existing>;

    /// Creates or updates a record and optionally its image in one transaction
    ///
    /// The lookup is repeated inside the transaction and decides the branch:
    /// same fingerprint leaves tokens alone and only fills a missing image,
    /// a known site id under a new fingerprint replaces the tokens, anything
    /// else creates a record.
    fn upsert(
        &mut self,
        tables: &SourceTables,
        item: &ScrapedItem,
        image: Option<&DownloadedImage>,
    ) -> PersistResult<UpsertOutcome>;

    /// Gets a record by ID
    fn get_record(&self, tables: &SourceTables, id: i64) -> PersistResult<Option<Record>>;

    /// Gets the record holding a fingerprint
    fn get_record_by_fingerprint(
        &self,
        tables: &SourceTables,
        fingerprint: &str,
    ) -> PersistResult<Option<Record>>;

    /// Gets the image owned by a record
    fn get_image(&self, tables: &SourceTables, record_id: i64) -> PersistResult<Option<Image>>;

    // ===== Statistics =====

    /// Counts records
    fn count_records(&self, tables: &SourceTables) -> PersistResult<u64>;

    /// Counts images
    fn count_images(&self, tables: &SourceTables) -> PersistResult<u64>;

    /// Counts records still waiting for an image
    fn count_records_without_image(&self, tables: &SourceTables) -> PersistResult<u64>;
}
