//! Store statistics
//!
//! Per-source counts read back from the store, printed by `--stats`.

use crate::storage::{PersistResult, SourceTables, Storage};

/// Counts for one source's tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatistics {
    pub source: String,

    /// Records stored for the source
    pub records: u64,

    /// Images owned by those records
    pub images: u64,

    /// Records a later run should try to attach an image to
    pub without_image: u64,
}

impl SourceStatistics {
    /// Share of records that own an image, in percent
    pub fn image_coverage(&self) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        (self.records - self.without_image) as f64 / self.records as f64 * 100.0
    }
}

/// Loads statistics for one source
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `tables` - The source's table names
///
/// # Returns
///
/// * `Ok(SourceStatistics)` - Successfully loaded statistics
/// * `Err(PersistError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    tables: &SourceTables,
) -> PersistResult<SourceStatistics> {
    Ok(SourceStatistics {
        source: tables.source.clone(),
        records: storage.count_records(tables)?,
        images: storage.count_images(tables)?,
        without_image: storage.count_records_without_image(tables)?,
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &[SourceStatistics]) {
    println!("=== Store Statistics ===\n");

    for source in stats {
        println!("{}:", source.source);
        println!("  Records: {}", source.records);
        println!("  Images: {}", source.images);
        println!(
            "  Awaiting image: {} ({:.1}% covered)",
            source.without_image,
            source.image_coverage()
        );
        println!();
    }

    let records: u64 = stats.iter().map(|s| s.records).sum();
    let images: u64 = stats.iter().map(|s| s.images).sum();
    println!("Total: {} records, {} images", records, images);
}
