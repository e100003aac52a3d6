//! Crawler coordinator - the crawl engine
//!
//! This module owns one crawl session from seeding to report:
//! - Deriving the target domain from the start URL
//! - Seeding the frontier through the uniqueness gate
//! - Spawning the dispatcher and the worker pool
//! - Walking the engine through Idle, Running, Draining and Finished

use crate::config::CrawlerConfig;
use crate::crawler::context::CrawlContext;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::LinkExtractor;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::{scheduler, worker};
use crate::state::{CrawlCounters, CrawlReport, EngineState, StateCell, UniquenessGate};
use crate::url::parse_start_url;
use crate::{ConfigError, CrawlerError};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 3;

/// Default delay between two fetches across all workers
pub const DEFAULT_RATE_INTERVAL: Duration = Duration::from_secs(2);

/// Default dispatcher backoff when there is nothing to hand out
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(250);

/// Parameters of one crawl session
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub start_url: String,
    /// Pages to fetch before draining
    pub page_limit: u64,
    pub workers: usize,
    /// One fetch permit per interval, shared by all workers
    pub rate_interval: Duration,
    /// Capacity of the channel between dispatcher and workers
    pub intake_capacity: usize,
    pub idle_backoff: Duration,
}

impl CrawlSettings {
    /// Settings with the default worker count, rate and backoff
    pub fn new(start_url: impl Into<String>, page_limit: u64) -> Self {
        Self {
            start_url: start_url.into(),
            page_limit,
            workers: DEFAULT_WORKERS,
            rate_interval: DEFAULT_RATE_INTERVAL,
            intake_capacity: DEFAULT_WORKERS * 2,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            start_url: config.start_url.clone(),
            page_limit: config.page_limit,
            workers: config.workers as usize,
            rate_interval: Duration::from_millis(config.rate_interval_ms),
            intake_capacity: config.effective_intake_capacity(),
            idle_backoff: Duration::from_millis(config.idle_backoff_ms),
        }
    }

    /// Sets the worker count and sizes the intake to match
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self.intake_capacity = workers * 2;
        self
    }

    pub fn with_rate_interval(mut self, interval: Duration) -> Self {
        self.rate_interval = interval;
        self
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::Validation(
                "page limit must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Validation(
                "at least one worker is required".to_string(),
            ));
        }
        if self.intake_capacity == 0 {
            return Err(ConfigError::Validation(
                "intake capacity must be at least 1".to_string(),
            ));
        }
        if self.rate_interval.is_zero() || self.idle_backoff.is_zero() {
            return Err(ConfigError::Validation(
                "rate interval and idle backoff must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The crawl engine
///
/// Construction derives the target domain and seeds the frontier; [`run`]
/// drives the crawl to completion exactly once.
///
/// [`run`]: Coordinator::run
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    settings: CrawlSettings,
}

impl Coordinator {
    /// Creates a coordinator in the Idle state
    ///
    /// # Arguments
    ///
    /// * `settings` - Session parameters
    /// * `fetcher` - Fetches and persists pages
    /// * `extractor` - Pulls hrefs out of fetched content
    /// * `gate` - Seen set, possibly preloaded from an earlier session
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlerError)` - Invalid start URL or settings
    pub fn new(
        settings: CrawlSettings,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn LinkExtractor>,
        gate: Arc<UniquenessGate>,
    ) -> Result<Self, CrawlerError> {
        settings.validate()?;
        let (start_url, target_domain) = parse_start_url(&settings.start_url)?;

        let frontier = Frontier::new();
        if gate.is_unique(start_url.as_str()) {
            frontier.push_back(start_url.to_string());
        } else {
            tracing::info!(
                "Start URL {} was visited in an earlier session; nothing to seed",
                start_url
            );
        }

        tracing::info!(
            "Crawl of {} prepared: target domain {}, page limit {}, {} workers",
            start_url,
            target_domain,
            settings.page_limit,
            settings.workers
        );

        let ctx = CrawlContext {
            frontier,
            gate,
            counters: CrawlCounters::default(),
            state: StateCell::new(EngineState::Idle),
            in_flight: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            fetcher,
            extractor,
            target_domain,
            page_limit: settings.page_limit,
            idle_backoff: settings.idle_backoff,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            settings,
        })
    }

    /// Runs the crawl until the budget is spent or no work remains
    ///
    /// Valid once, from Idle. Returns after every worker has exited.
    pub async fn run(&self) -> Result<CrawlReport, CrawlerError> {
        self.ctx
            .state
            .advance(EngineState::Idle)
            .map_err(|from| CrawlerError::InvalidTransition {
                from,
                to: EngineState::Running,
            })?;

        let started = Instant::now();
        tracing::info!("Crawl of {} running", self.ctx.target_domain);

        let limiter = Arc::new(RateLimiter::new(self.settings.rate_interval));
        let (sender, receiver) = mpsc::channel(self.settings.intake_capacity);
        let intake: worker::SharedIntake = Arc::new(Mutex::new(receiver));

        let workers: Vec<_> = (0..self.settings.workers)
            .map(|id| {
                tokio::spawn(worker::run_worker(
                    id,
                    Arc::clone(&self.ctx),
                    Arc::clone(&limiter),
                    Arc::clone(&intake),
                ))
            })
            .collect();
        drop(intake);

        let dispatcher = tokio::spawn(scheduler::dispatch(Arc::clone(&self.ctx), sender));
        let outcome = dispatcher.await;

        // Every worker is joined before any task failure is reported
        let mut joined = Ok(());
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
                if joined.is_ok() {
                    joined = Err(e);
                }
            }
        }
        let outcome = outcome?;
        joined?;
        tracing::debug!("Dispatcher stopped: {:?}", outcome);

        self.ctx
            .state
            .advance(EngineState::Draining)
            .map_err(|from| CrawlerError::InvalidTransition {
                from,
                to: EngineState::Finished,
            })?;

        let report = self.report(started.elapsed());

        tracing::info!(
            "Crawl finished: {} pages, {} bytes, {} errors in {:.1}s",
            report.pages_fetched,
            report.bytes_fetched,
            report.errors,
            report.duration.as_secs_f64()
        );

        Ok(report)
    }

    /// Stops a running crawl the way the budget does
    ///
    /// Dispatch ceases, intake closes and workers finish only the fetch they
    /// are in; [`run`] then returns its report as usual. Cancelling before
    /// `run` makes the run drain at once.
    ///
    /// [`run`]: Coordinator::run
    pub fn cancel(&self) {
        if self.state().is_stopping() {
            return;
        }
        if self.ctx.cancel() {
            tracing::info!("Cancelling crawl of {}", self.ctx.target_domain);
        }
    }

    /// Statistics as they stand now
    pub fn report(&self, duration: Duration) -> CrawlReport {
        CrawlReport::from_counters(
            &self.ctx.counters,
            duration,
            self.ctx.frontier.len(),
            self.ctx.gate.count(),
        )
    }

    pub fn state(&self) -> EngineState {
        self.ctx.state.get()
    }

    /// Domain the crawl is confined to, subdomains included
    pub fn target_domain(&self) -> &str {
        &self.ctx.target_domain
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn gate(&self) -> &Arc<UniquenessGate> {
        &self.ctx.gate
    }

    pub fn frontier_len(&self) -> usize {
        self.ctx.frontier.len()
    }

    /// Pending URLs in dequeue order
    pub fn frontier_snapshot(&self) -> Vec<String> {
        self.ctx.frontier.snapshot()
    }
}
