//! missing-persons main entry point
//!
//! Command-line wrapper around the ingestion pipeline: loads configuration,
//! opens the store and runs every selected source concurrently.

use anyhow::{bail, Context};
use clap::Parser;
use missing_persons::config::{load_config, Config};
use missing_persons::crawler::crawl;
use missing_persons::output::{load_statistics, print_run_reports, print_statistics};
use missing_persons::sources::build_sources;
use missing_persons::storage::{SourceTables, SqliteStorage, Storage, StoreHandle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Scrapes missing-person registers into a local SQLite store
///
/// Every run is idempotent: unchanged entries are left alone, changed ones
/// are updated in place and photographs that failed to download earlier
/// are fetched again.
#[derive(Parser, Debug)]
#[command(name = "missing-persons")]
#[command(version)]
#[command(about = "Missing-persons register scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run only this source (repeatable)
    #[arg(short, long = "source", value_name = "NAME")]
    sources: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::info!(database = %config.database.path, "configuration loaded");

    let storage = SqliteStorage::new(Path::new(&config.database.path))
        .with_context(|| format!("failed to open store {}", config.database.path))?;
    let store = StoreHandle::new(storage);

    if cli.stats {
        handle_stats(&config, &store, &cli.sources)
    } else {
        handle_run(&config, &store, &cli.sources).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins over the command-line flags when it is set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("missing_persons=info,warn"),
                1 => EnvFilter::new("missing_persons=debug,info"),
                2 => EnvFilter::new("missing_persons=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows per-source counts from the database
fn handle_stats(config: &Config, store: &StoreHandle, only: &[String]) -> anyhow::Result<()> {
    let mut stats = Vec::new();

    for source in build_sources(&config.sources)? {
        if !only.is_empty() && !only.iter().any(|name| name == source.name()) {
            continue;
        }

        let tables = SourceTables::for_source(source.name())?;
        let source_stats = store.with(|s| {
            s.initialize_source(&tables)?;
            load_statistics(&*s, &tables)
        })?;
        stats.push(source_stats);
    }

    println!("Database: {}\n", config.database.path);
    print_statistics(&stats);

    Ok(())
}

/// Handles the main pipeline run
async fn handle_run(config: &Config, store: &StoreHandle, only: &[String]) -> anyhow::Result<()> {
    let reports = crawl(config, store, only).await?;

    if !reports.is_empty() {
        print_run_reports(&reports);
    }

    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.source)
        .collect();

    if !failed.is_empty() {
        bail!("source runs failed: {}", failed.join(", "));
    }

    tracing::info!("pipeline completed successfully");
    Ok(())
}
