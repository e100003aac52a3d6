//! Crawler module for web page fetching and processing
//!
//! This module contains the concurrent crawl engine, including:
//! - The FIFO frontier and the dispatcher feeding the worker pool
//! - HTTP fetching with page persistence
//! - HTML link extraction
//! - Global rate limiting
//! - Overall crawl coordination

mod context;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod rate_limiter;
mod scheduler;
mod worker;

pub use coordinator::{
    Coordinator, CrawlSettings, DEFAULT_IDLE_BACKOFF, DEFAULT_RATE_INTERVAL, DEFAULT_WORKERS,
};
pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use frontier::Frontier;
pub use parser::{HtmlLinkExtractor, LinkExtractor};
pub use rate_limiter::RateLimiter;
pub use scheduler::DispatchOutcome;

use crate::config::Config;
use crate::state::{CrawlReport, UniquenessGate};
use crate::storage::{open_storage, RunStatus, RunTotals, Storage, StorageError};
use crate::CrawlerError;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the page store
/// 2. Preload the uniqueness gate with every stored URL (unless `fresh`)
/// 3. Build the HTTP client and the crawl engine
/// 4. Record a new run, crawl, and stamp the run with its totals
///
/// Ctrl-C stops the crawl early: the engine drains as if its budget were
/// spent and the run is recorded as interrupted with the totals reached.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, recorded on the run
/// * `fresh` - Skip preloading, so pages from earlier sessions are fetched again
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(CrawlerError)` - Crawl could not start or failed
pub async fn crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<CrawlReport, CrawlerError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;

    let gate = Arc::new(UniquenessGate::new());
    if fresh {
        tracing::info!("Fresh crawl: not preloading known URLs");
    } else {
        let known = storage.get_all_urls()?;
        tracing::info!("Preloading {} URLs from earlier sessions", known.len());
        gate.preload(known);
    }

    let settings = CrawlSettings::from_config(&config.crawler);
    let start_url = settings.start_url.clone();

    let storage = Arc::new(Mutex::new(storage));
    let fetcher = HttpFetcher::from_config(&config, Arc::clone(&storage))?;

    let run_id = storage
        .lock()
        .map_err(|_| StorageError::Poisoned)?
        .create_run(config_hash, &start_url)?;

    let (status, outcome) = match Coordinator::new(
        settings,
        Arc::new(fetcher),
        Arc::new(HtmlLinkExtractor::new()),
        gate,
    ) {
        Ok(coordinator) => run_until_interrupted(&coordinator).await,
        Err(e) => (RunStatus::Failed, Err(e)),
    };

    let totals = match &outcome {
        Ok(report) => RunTotals::from(report),
        Err(e) => {
            tracing::error!("Run {} failed: {}", run_id, e);
            RunTotals::default()
        }
    };

    storage
        .lock()
        .map_err(|_| StorageError::Poisoned)?
        .finish_run(run_id, status, &totals)?;

    outcome
}

/// Runs the engine to completion, draining it early on Ctrl-C
async fn run_until_interrupted(
    coordinator: &Coordinator,
) -> (RunStatus, Result<CrawlReport, CrawlerError>) {
    let run = coordinator.run();
    tokio::pin!(run);

    let finished = tokio::select! {
        result = &mut run => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let (status, result) = match finished {
        Some(result) => (RunStatus::Completed, result),
        None => {
            tracing::warn!("Interrupted, waiting for in-flight fetches to finish");
            coordinator.cancel();
            (RunStatus::Interrupted, run.await)
        }
    };

    match result {
        Ok(report) => (status, Ok(report)),
        Err(e) => (RunStatus::Failed, Err(e)),
    }
}
