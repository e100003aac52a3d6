//! The uniqueness gate: the crawl's seen set
//!
//! Every canonical URL passes through [`UniquenessGate::is_unique`] before it
//! may enter the frontier. The membership test and the insertion happen under
//! one exclusive lock, so two workers that discover the same link at the same
//! moment can never both be told it is new.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe set of canonical URLs with atomic check-and-mark
#[derive(Debug, Default)]
pub struct UniquenessGate {
    seen: Mutex<HashSet<String>>,
}

impl UniquenessGate {
    /// Creates an empty gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate already holding `urls`
    pub fn with_preloaded<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let gate = Self::new();
        gate.preload(urls);
        gate
    }

    /// Marks `url` as seen and reports whether this call was the first to do so
    ///
    /// Returns true exactly once per distinct URL for the lifetime of the gate.
    pub fn is_unique(&self, url: &str) -> bool {
        let mut seen = self.lock();
        if seen.contains(url) {
            return false;
        }
        seen.insert(url.to_string())
    }

    /// Returns the subset of `urls` that was newly admitted, in input order
    ///
    /// Every returned URL is marked as seen. Duplicates inside `urls` are
    /// admitted once.
    pub fn filter_unique<I, S>(&self, urls: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = self.lock();
        urls.into_iter()
            .filter_map(|url| {
                let url = url.as_ref();
                (!seen.contains(url) && seen.insert(url.to_string())).then(|| url.to_string())
            })
            .collect()
    }

    /// Bulk-inserts URLs known from a previous session without reporting results
    pub fn preload<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = self.lock();
        seen.extend(urls.into_iter().map(Into::into));
    }

    /// Read-only membership test
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Number of distinct URLs recorded so far
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Forgets every URL; only meant for starting a new session
    pub fn reset(&self) {
        self.lock().clear();
    }

    // A poisoned lock still holds a consistent set: every mutation is a single
    // HashSet call, so recover the guard instead of propagating the panic.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
