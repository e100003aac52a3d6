//! Statistics generation from the crawl database and the live crawl
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer, and for printing the report of
//! a crawl that just finished.

use crate::state::CrawlReport;
use crate::storage::{RunRecord, Storage, StorageResult};
use chrono::{DateTime, Utc};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Total stored content, in bytes
    pub total_bytes: u64,

    /// Page counts by HTTP status, most frequent first (0 = unknown)
    pub pages_by_status: Vec<(u16, u64)>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    /// Pages stored with a 2xx status
    pub fn successful_pages(&self) -> u64 {
        self.pages_by_status
            .iter()
            .filter(|(status, _)| (200..300).contains(status))
            .map(|(_, count)| count)
            .sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        total_pages: storage.count_pages()?,
        total_bytes: storage.total_bytes()?,
        pages_by_status: storage.count_pages_by_status()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Wall-clock duration of a finished run, in seconds
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages stored: {}", stats.total_pages);
    println!("  Total content: {} bytes", stats.total_bytes);
    println!();

    if !stats.pages_by_status.is_empty() {
        println!("Pages by Status:");
        for (status, count) in &stats.pages_by_status {
            let percentage = if stats.total_pages > 0 {
                (*count as f64 / stats.total_pages as f64) * 100.0
            } else {
                0.0
            };
            let label = if *status == 0 {
                "unknown".to_string()
            } else {
                status.to_string()
            };
            println!("  {}: {} ({:.1}%)", label, count, percentage);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Start URL: {}", run.start_url);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = run_duration_seconds(run) {
                println!("  Duration: {}s", seconds);
            }
            println!("  Pages fetched: {}", run.totals.pages_fetched);
            println!("  Bytes fetched: {}", run.totals.bytes_fetched);
            println!("  Errors: {}", run.totals.errors);
            println!("  Links discovered: {}", run.totals.links_discovered);
        }
        None => println!("No crawl runs recorded"),
    }
    println!();

    let successful = stats.successful_pages();
    let success_rate = if stats.total_pages > 0 {
        (successful as f64 / stats.total_pages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages returned 2xx)",
        success_rate, successful, stats.total_pages
    );
}

/// Prints the report of a finished crawl
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");
    println!("  Duration: {:.1}s", report.duration.as_secs_f64());
    println!(
        "  Pages fetched: {} ({:.2} pages/sec)",
        report.pages_fetched,
        report.pages_per_second()
    );
    println!("  Bytes fetched: {}", report.bytes_fetched);
    println!("  Errors: {}", report.errors);
    println!();
    println!("Links:");
    println!("  Discovered: {}", report.links_discovered);
    println!("  Enqueued: {}", report.links_enqueued);
    println!("  Off domain: {}", report.links_off_domain);
    println!("  Invalid: {}", report.links_invalid);
    println!();
    println!("  Unique URLs seen: {}", report.unique_urls);
    println!("  Left in frontier: {}", report.frontier_len);
}
