//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use domain_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.crawler.start_url, config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, UserAgentConfig, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_IDLE_BACKOFF_MS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
