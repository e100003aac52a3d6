//! State shared by the dispatcher and every worker of one crawl

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::LinkExtractor;
use crate::state::{CrawlCounters, EngineState, StateCell, UniquenessGate};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct CrawlContext {
    pub frontier: Frontier,
    pub gate: Arc<UniquenessGate>,
    pub counters: CrawlCounters,
    pub state: StateCell,
    /// URLs handed to the intake channel whose links are not yet enqueued
    pub in_flight: AtomicUsize,
    /// Set once when the crawl is asked to stop early
    pub cancelled: AtomicBool,
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub target_domain: String,
    pub page_limit: u64,
    pub idle_backoff: Duration,
}

impl CrawlContext {
    pub fn budget_reached(&self) -> bool {
        self.counters.pages_fetched() >= self.page_limit
    }

    /// Asks the dispatcher and workers to stop; returns false if already asked
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True once no further fetch may start
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.budget_reached()
    }

    /// Moves Running to Draining; later calls are no-ops
    pub fn begin_draining(&self) {
        if self.state.advance(EngineState::Running).is_ok() {
            tracing::info!(
                "Draining: {} pages fetched, {} URLs left in frontier",
                self.counters.pages_fetched(),
                self.frontier.len()
            );
        }
    }

    /// Counts a URL about to be handed to the intake channel
    pub fn mark_dispatched(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Reverts [`Self::mark_dispatched`] for a URL the channel refused
    pub fn unmark_dispatched(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Takes over the count for a URL a worker has received
    pub fn receive_ticket(&self) -> InFlight<'_> {
        InFlight(&self.in_flight)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Releases one in-flight count on drop
///
/// Workers hold it for the whole handling of a URL so the count falls only
/// once that URL's links are in the frontier, whatever path the worker takes.
pub(crate) struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
