//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{PageRecord, RunRecord, RunStatus, RunTotals, SaveOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler.
/// Callers sharing one backend between workers wrap it in a mutex.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str, start_url: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Stamps a run with its final status, finish time and totals
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()>;

    // ===== Page Management =====

    /// Persists a fetched page keyed by URL
    ///
    /// A URL that is already stored is left untouched and reported as
    /// [`SaveOutcome::AlreadyStored`]; that is not an error.
    fn save_page(
        &mut self,
        url: &str,
        content: &str,
        status_code: u16,
    ) -> StorageResult<SaveOutcome>;

    /// Gets a page by URL
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Every stored URL, used to hydrate the uniqueness gate at startup
    fn get_all_urls(&self) -> StorageResult<Vec<String>>;

    // ===== Statistics =====

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    /// Page counts grouped by HTTP status, most frequent first
    fn count_pages_by_status(&self) -> StorageResult<Vec<(u16, u64)>>;

    /// Sum of stored content lengths in bytes
    fn total_bytes(&self) -> StorageResult<u64>;
}
