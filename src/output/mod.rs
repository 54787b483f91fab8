//! Output module for run reports and store statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, SourceStatistics};

use crate::crawler::SourceReport;

/// Prints one line per finished source run
pub fn print_run_reports(reports: &[SourceReport]) {
    for report in reports {
        match &report.result {
            Ok(summary) => println!(
                "{}: {} pages, {} candidates, {} created, {} updated, {} unchanged, {} images, {} failures",
                report.source,
                summary.pages,
                summary.candidates,
                summary.created,
                summary.updated,
                summary.unchanged,
                summary.images_stored,
                summary.failures
            ),
            Err(e) => println!("{}: failed: {}", report.source, e),
        }
    }
}
