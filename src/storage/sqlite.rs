//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{PageRecord, RunRecord, RunStatus, RunTotals, SaveOutcome};
use crate::CrawlerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, start_url, status,
     pages_fetched, bytes_fetched, errors, links_discovered";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Database {} opened and schema verified", path.display());
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            start_url: row.get(4)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                .unwrap_or(RunStatus::Running),
            totals: RunTotals {
                pages_fetched: row.get::<_, i64>(6)? as u64,
                bytes_fetched: row.get::<_, i64>(7)? as u64,
                errors: row.get::<_, i64>(8)? as u64,
                links_discovered: row.get::<_, i64>(9)? as u64,
            },
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, start_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, start_url, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, start_url, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                Self::run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                Self::run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_fetched = ?3,
             bytes_fetched = ?4, errors = ?5, links_discovered = ?6 WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                totals.pages_fetched as i64,
                totals.bytes_fetched as i64,
                totals.errors as i64,
                totals.links_discovered as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Page Management =====

    fn save_page(
        &mut self,
        url: &str,
        content: &str,
        status_code: u16,
    ) -> StorageResult<SaveOutcome> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO pages (url, html_content, status_code, content_length, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO NOTHING",
            params![url, content, status_code, content.len() as i64, now],
        )?;

        Ok(if inserted == 0 {
            SaveOutcome::AlreadyStored
        } else {
            SaveOutcome::Inserted
        })
    }

    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                "SELECT id, url, html_content, status_code, content_length, crawled_at
                 FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        html_content: row.get(2)?,
                        status_code: row.get(3)?,
                        content_length: row.get::<_, i64>(4)? as u64,
                        crawled_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(page)
    }

    fn get_all_urls(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM pages")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pages_by_status(&self) -> StorageResult<Vec<(u16, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(status_code, 0), COUNT(*) AS count FROM pages
             GROUP BY status_code ORDER BY count DESC, status_code ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn total_bytes(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(content_length), 0) FROM pages",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_create_and_get_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage
            .create_run("test_hash", "https://example.com/")
            .unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.start_url, "https://example.com/");
        assert!(run.finished_at.is_none());
        assert_eq!(run.totals, RunTotals::default());
    }

    #[test]
    fn test_get_missing_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_finish_run_records_totals() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h", "https://example.com/").unwrap();

        let totals = RunTotals {
            pages_fetched: 12,
            bytes_fetched: 3400,
            errors: 2,
            links_discovered: 80,
        };
        storage
            .finish_run(run_id, RunStatus::Completed, &totals)
            .unwrap();

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
        assert_eq!(run.totals, totals);
    }

    #[test]
    fn test_finish_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.finish_run(7, RunStatus::Failed, &RunTotals::default());
        assert!(matches!(result, Err(StorageError::RunNotFound(7))));
    }

    #[test]
    fn test_latest_run_empty() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_save_page() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let outcome = storage
            .save_page("https://example.com/", "<html></html>", 200)
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted);

        let page = storage
            .get_page_by_url("https://example.com/")
            .unwrap()
            .unwrap();
        assert_eq!(page.status_code, Some(200));
        assert_eq!(page.html_content.as_deref(), Some("<html></html>"));
        assert_eq!(page.content_length, 13);
    }

    #[test]
    fn test_save_duplicate_page_is_not_an_error() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .save_page("https://example.com/", "first", 200)
            .unwrap();
        let outcome = storage
            .save_page("https://example.com/", "second", 500)
            .unwrap();
        assert_eq!(outcome, SaveOutcome::AlreadyStored);

        let page = storage
            .get_page_by_url("https://example.com/")
            .unwrap()
            .unwrap();
        assert_eq!(page.html_content.as_deref(), Some("first"));
        assert_eq!(storage.count_pages().unwrap(), 1);
    }

    #[test]
    fn test_get_all_urls() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.save_page("https://example.com/a", "", 200).unwrap();
        storage.save_page("https://example.com/b", "", 404).unwrap();

        let mut urls = storage.get_all_urls().unwrap();
        urls.sort();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.save_page("https://example.com/a", "aaaa", 200).unwrap();
        storage.save_page("https://example.com/b", "bb", 200).unwrap();
        storage.save_page("https://example.com/c", "c", 404).unwrap();

        assert_eq!(storage.count_pages().unwrap(), 3);
        assert_eq!(storage.total_bytes().unwrap(), 7);
        assert_eq!(
            storage.count_pages_by_status().unwrap(),
            vec![(200, 2), (404, 1)]
        );
    }

    #[test]
    fn test_reopen_file_database_keeps_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawler.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.save_page("https://example.com/", "x", 200).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.get_all_urls().unwrap(), vec!["https://example.com/"]);
    }
}
