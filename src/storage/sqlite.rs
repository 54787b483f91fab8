//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_source_schema;
use crate::storage::traits::{PersistResult, Storage};
use crate::storage::{
    DownloadedImage, Existing, Image, Record, ScrapedItem, SourceTables, UpsertAction,
    UpsertOutcome,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(PersistError)` - Failed to open database
    pub fn new(path: &Path) -> PersistResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }
}

/// Fingerprint first, then site id
fn find_existing(
    conn: &Connection,
    tables: &SourceTables,
    fingerprint: &str,
    source_item_id: &str,
) -> rusqlite::Result<Existing> {
    let by_fingerprint: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE unique_identifier = ?1",
                tables.records
            ),
            params![fingerprint],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(record_id) = by_fingerprint {
        let has_image = image_id(conn, tables, record_id)?.is_some();
        return Ok(Existing::SameContent {
            record_id,
            has_image,
        });
    }

    let by_item_id: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE item_id = ?1 ORDER BY id LIMIT 1",
                tables.records
            ),
            params![source_item_id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(match by_item_id {
        Some(record_id) => Existing::ChangedContent { record_id },
        None => Existing::Missing,
    })
}

fn image_id(conn: &Connection, tables: &SourceTables, record_id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        &format!("SELECT id FROM {} WHERE item_id = ?1", tables.images),
        params![record_id],
        |row| row.get(0),
    )
    .optional()
}

/// Inserts the record's image or replaces the existing one
fn store_image(
    conn: &Connection,
    tables: &SourceTables,
    record_id: i64,
    image: &DownloadedImage,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} (item_id, extension, blob) VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id) DO UPDATE SET extension = excluded.extension, blob = excluded.blob",
            tables.images
        ),
        params![record_id, image.extension, image.blob],
    )?;
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<(Record, String)> {
    let data: String = row.get(1)?;
    Ok((
        Record {
            id: row.get(0)?,
            tokens: Vec::new(),
            source_item_id: row.get(2)?,
            fingerprint: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        data,
    ))
}

impl SqliteStorage {
    fn query_record(
        &self,
        tables: &SourceTables,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> PersistResult<Option<Record>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, data, item_id, unique_identifier, created_at, updated_at
                     FROM {} WHERE {} = ?1",
                    tables.records, column
                ),
                params![value],
                record_from_row,
            )
            .optional()?;

        match row {
            Some((mut record, data)) => {
                record.tokens = serde_json::from_str(&data)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

impl Storage for SqliteStorage {
    // ===== Schema =====

    fn initialize_source(&mut self, tables: &SourceTables) -> PersistResult<()> {
        initialize_source_schema(&self.conn, tables)?;
        Ok(())
    }

    // ===== Records =====

    fn lookup(
        &self,
        tables: &SourceTables,
        fingerprint: &str,
        source_item_id: &str,
    ) -> PersistResult<Existing> {
        Ok(find_existing(&self.conn, tables, fingerprint, source_item_id)?)
    }

    fn upsert(
        &mut self,
        tables: &SourceTables,
        item: &ScrapedItem,
        image: Option<&DownloadedImage>,
    ) -> PersistResult<UpsertOutcome> {
        let payload = serde_json::to_string(&item.tokens)?;
        let now = Utc::now().to_rfc3339();

        // Dropping the transaction on an early return rolls it back
        let tx = self.conn.transaction()?;

        let outcome = match find_existing(&tx, tables, &item.fingerprint, &item.source_item_id)? {
            Existing::Missing => {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (data, item_id, unique_identifier, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)",
                        tables.records
                    ),
                    params![payload, item.source_item_id, item.fingerprint, now],
                )?;
                let record_id = tx.last_insert_rowid();

                if let Some(image) = image {
                    store_image(&tx, tables, record_id, image)?;
                }

                UpsertOutcome {
                    record_id,
                    action: UpsertAction::Created,
                    image_stored: image.is_some(),
                }
            }

            Existing::ChangedContent { record_id } => {
                tx.execute(
                    &format!(
                        "UPDATE {} SET data = ?1, item_id = ?2, unique_identifier = ?3, updated_at = ?4
                         WHERE id = ?5",
                        tables.records
                    ),
                    params![payload, item.source_item_id, item.fingerprint, now, record_id],
                )?;

                // A failed download keeps whatever image the record had
                if let Some(image) = image {
                    store_image(&tx, tables, record_id, image)?;
                }

                UpsertOutcome {
                    record_id,
                    action: UpsertAction::Updated,
                    image_stored: image.is_some(),
                }
            }

            Existing::SameContent {
                record_id,
                has_image,
            } => {
                let fill = if has_image { None } else { image };
                if let Some(image) = fill {
                    store_image(&tx, tables, record_id, image)?;
                }

                UpsertOutcome {
                    record_id,
                    action: UpsertAction::Unchanged,
                    image_stored: fill.is_some(),
                }
            }
        };

        tx.commit()?;

        Ok(outcome)
    }

    fn get_record(&self, tables: &SourceTables, id: i64) -> PersistResult<Option<Record>> {
        self.query_record(tables, "id", &id)
    }

    fn get_record_by_fingerprint(
        &self,
        tables: &SourceTables,
        fingerprint: &str,
    ) -> PersistResult<Option<Record>> {
        self.query_record(tables, "unique_identifier", &fingerprint)
    }

    fn get_image(&self, tables: &SourceTables, record_id: i64) -> PersistResult<Option<Image>> {
        let image = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, item_id, extension, blob FROM {} WHERE item_id = ?1",
                    tables.images
                ),
                params![record_id],
                |row| {
                    Ok(Image {
                        id: row.get(0)?,
                        owner_record_id: row.get(1)?,
                        extension: row.get(2)?,
                        blob: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(image)
    }

    // ===== Statistics =====

    fn count_records(&self, tables: &SourceTables) -> PersistResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", tables.records),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_images(&self, tables: &SourceTables) -> PersistResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", tables.images),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_records_without_image(&self, tables: &SourceTables) -> PersistResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {records} r
                 WHERE NOT EXISTS (SELECT 1 FROM {images} i WHERE i.item_id = r.id)",
                records = tables.records,
                images = tables.images
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SqliteStorage, SourceTables) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let tables = SourceTables::for_source("croatia").unwrap();
        storage.initialize_source(&tables).unwrap();
        (storage, tables)
    }

    fn item(id: &str, tokens: &[&str]) -> ScrapedItem {
        ScrapedItem::new(id, tokens.iter().map(|t| t.to_string()).collect())
    }

    fn jpeg(bytes: &[u8]) -> DownloadedImage {
        DownloadedImage {
            extension: "jpg".to_string(),
            blob: bytes.to_vec(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_new_record_with_image() {
        let (mut storage, tables) = setup();
        let jane = item("101", &["Jane", "Doe", "1990"]);

        let outcome = storage.upsert(&tables, &jane, Some(&jpeg(b"\xff\xd8"))).unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);
        assert!(outcome.image_stored);

        let record = storage.get_record(&tables, outcome.record_id).unwrap().unwrap();
        assert_eq!(record.tokens, vec!["Jane", "Doe", "1990"]);
        assert_eq!(record.source_item_id, "101");
        assert_eq!(record.fingerprint, jane.fingerprint);

        let image = storage.get_image(&tables, outcome.record_id).unwrap().unwrap();
        assert_eq!(image.owner_record_id, outcome.record_id);
        assert_eq!(image.extension, "jpg");
        assert_eq!(image.blob, b"\xff\xd8");
    }

    #[test]
    fn test_unchanged_rerun_is_noop() {
        let (mut storage, tables) = setup();
        let jane = item("101", &["Jane", "Doe", "1990"]);

        let first = storage.upsert(&tables, &jane, Some(&jpeg(b"a"))).unwrap();
        let before = storage.get_record(&tables, first.record_id).unwrap().unwrap();

        let second = storage.upsert(&tables, &jane, Some(&jpeg(b"b"))).unwrap();
        assert_eq!(second.action, UpsertAction::Unchanged);
        assert_eq!(second.record_id, first.record_id);
        assert!(!second.image_stored);

        let after = storage.get_record(&tables, first.record_id).unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(storage.count_records(&tables).unwrap(), 1);
        assert_eq!(storage.count_images(&tables).unwrap(), 1);
        // The existing image is not replaced on an unchanged record
        assert_eq!(
            storage.get_image(&tables, first.record_id).unwrap().unwrap().blob,
            b"a"
        );
    }

    #[test]
    fn test_missing_image_is_filled_later() {
        let (mut storage, tables) = setup();
        let jane = item("101", &["Jane", "Doe"]);

        let first = storage.upsert(&tables, &jane, None).unwrap();
        assert_eq!(first.action, UpsertAction::Created);
        assert!(!first.image_stored);
        assert_eq!(storage.count_records_without_image(&tables).unwrap(), 1);
        assert_eq!(
            storage.lookup(&tables, &jane.fingerprint, "101").unwrap(),
            Existing::SameContent {
                record_id: first.record_id,
                has_image: false
            }
        );

        let second = storage.upsert(&tables, &jane, Some(&jpeg(b"img"))).unwrap();
        assert_eq!(second.action, UpsertAction::Unchanged);
        assert!(second.image_stored);
        assert_eq!(storage.count_records(&tables).unwrap(), 1);
        assert_eq!(storage.count_images(&tables).unwrap(), 1);
        assert_eq!(storage.count_records_without_image(&tables).unwrap(), 0);
    }

    #[test]
    fn test_changed_content_updates_in_place() {
        let (mut storage, tables) = setup();
        let old = item("101", &["Jane", "Doe", "missing since 2020"]);
        let new = item("101", &["Jane", "Doe", "found"]);

        let first = storage.upsert(&tables, &old, Some(&jpeg(b"old"))).unwrap();
        assert_eq!(
            storage.lookup(&tables, &new.fingerprint, "101").unwrap(),
            Existing::ChangedContent {
                record_id: first.record_id
            }
        );

        let second = storage.upsert(&tables, &new, Some(&jpeg(b"new"))).unwrap();
        assert_eq!(second.action, UpsertAction::Updated);
        assert_eq!(second.record_id, first.record_id);

        let record = storage.get_record(&tables, first.record_id).unwrap().unwrap();
        assert_eq!(record.fingerprint, new.fingerprint);
        assert_eq!(record.tokens[2], "found");
        assert!(storage
            .get_record_by_fingerprint(&tables, &old.fingerprint)
            .unwrap()
            .is_none());

        assert_eq!(storage.count_records(&tables).unwrap(), 1);
        assert_eq!(storage.count_images(&tables).unwrap(), 1);
        assert_eq!(
            storage.get_image(&tables, first.record_id).unwrap().unwrap().blob,
            b"new"
        );
    }

    #[test]
    fn test_update_without_image_keeps_previous_image() {
        let (mut storage, tables) = setup();
        let first = storage
            .upsert(&tables, &item("5", &["a"]), Some(&jpeg(b"keep")))
            .unwrap();

        let second = storage.upsert(&tables, &item("5", &["b"]), None).unwrap();
        assert_eq!(second.action, UpsertAction::Updated);
        assert!(!second.image_stored);
        assert_eq!(
            storage.get_image(&tables, first.record_id).unwrap().unwrap().blob,
            b"keep"
        );
    }

    #[test]
    fn test_distinct_items_create_distinct_records() {
        let (mut storage, tables) = setup();
        storage.upsert(&tables, &item("1", &["Ana"]), None).unwrap();
        storage.upsert(&tables, &item("2", &["Boris"]), None).unwrap();
        assert_eq!(storage.count_records(&tables).unwrap(), 2);
    }

    #[test]
    fn test_sources_are_namespaced() {
        let (mut storage, croatia) = setup();
        let romania = SourceTables::for_source("romania").unwrap();
        storage.initialize_source(&romania).unwrap();

        let same = item("1", &["Ana"]);
        storage.upsert(&croatia, &same, None).unwrap();
        let outcome = storage.upsert(&romania, &same, None).unwrap();

        assert_eq!(outcome.action, UpsertAction::Created);
        assert_eq!(storage.count_records(&croatia).unwrap(), 1);
        assert_eq!(storage.count_records(&romania).unwrap(), 1);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let (mut storage, tables) = setup();
        // Break the image table so the second statement of the transaction fails
        storage
            .conn
            .execute_batch("DROP TABLE croatia_images;")
            .unwrap();

        let result = storage.upsert(&tables, &item("9", &["x"]), Some(&jpeg(b"z")));
        assert!(result.is_err());
        assert_eq!(storage.count_records(&tables).unwrap(), 0);
    }

    #[test]
    fn test_lookup_missing() {
        let (storage, tables) = setup();
        assert_eq!(
            storage.lookup(&tables, "nope", "0").unwrap(),
            Existing::Missing
        );
        assert!(storage.get_record(&tables, 42).unwrap().is_none());
        assert!(storage.get_image(&tables, 42).unwrap().is_none());
    }

    #[test]
    fn test_uninitialized_source_is_a_hard_error() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let tables = SourceTables::for_source("romania").unwrap();
        assert!(storage.lookup(&tables, "f", "1").is_err());
    }
}
