//! Concurrent fan-out over sources
//!
//! Each orchestrator gets its own task. Every task handle is awaited exactly
//! once, so the caller only continues after all sources have finished,
//! whether they returned, failed or panicked.

use crate::crawler::{Orchestrator, RunSummary};
use crate::ScrapeError;
use tokio::task::JoinHandle;

/// Outcome of one source task
#[derive(Debug)]
pub struct SourceReport {
    pub source: &'static str,
    pub result: Result<RunSummary, ScrapeError>,
}

impl SourceReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs every orchestrator on its own task and waits for all of them
///
/// Reports come back in the order the orchestrators were given.
pub async fn run_sources(orchestrators: Vec<Orchestrator>) -> Vec<SourceReport> {
    let handles: Vec<(&'static str, JoinHandle<Result<RunSummary, ScrapeError>>)> = orchestrators
        .into_iter()
        .map(|orchestrator| {
            let source = orchestrator.source_name();
            let handle = tokio::spawn(async move { orchestrator.run().await });
            (source, handle)
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (source, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(source, error = %e, "source task did not complete");
                Err(ScrapeError::Worker {
                    source_name: source.to_string(),
                    message: e.to_string(),
                })
            }
        };

        if let Err(e) = &result {
            tracing::error!(source, error = %e, "source run failed");
        }

        reports.push(SourceReport { source, result });
    }

    reports
}
