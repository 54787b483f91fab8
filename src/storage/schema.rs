//! Database schema definitions
//!
//! Every source owns a record table and an image table. Table names come
//! from [`SourceTables`], which only admits `[a-z0-9_]`.

use crate::storage::SourceTables;

/// SQL schema for one source's tables
pub fn source_schema_sql(tables: &SourceTables) -> String {
    format!(
        r#"
-- Scraped entries, one per (source, fingerprint)
CREATE TABLE IF NOT EXISTS {records} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL,
    item_id TEXT NOT NULL,
    unique_identifier TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{records}_item_id ON {records}(item_id);

-- Photographs, at most one per entry
CREATE TABLE IF NOT EXISTS {images} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL UNIQUE REFERENCES {records}(id),
    extension TEXT NOT NULL,
    blob BLOB NOT NULL
);
"#,
        records = tables.records,
        images = tables.images,
    )
}

/// Initializes the schema for one source
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `tables` - The source's table names
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_source_schema(
    conn: &rusqlite::Connection,
    tables: &SourceTables,
) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&source_schema_sql(tables))?;
    Ok(())
}
