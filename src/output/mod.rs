//! Output module for crawl reports and statistics
//!
//! This module handles:
//! - Printing the report of a finished crawl
//! - Recording crawl statistics from the page store

pub mod stats;

pub use stats::{load_statistics, print_report, print_statistics, CrawlStatistics};
