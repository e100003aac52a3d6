//! Crawl session state: engine lifecycle and run counters
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

/// Lifecycle of a crawl engine
///
/// `Idle → Running → Draining → Finished`, each transition taken once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed, frontier seeded with the start URL
    Idle,

    /// Dispatcher and workers active
    Running,

    /// Budget reached or work exhausted; intake closed, workers finishing in-flight pages
    Draining,

    /// Every worker has returned
    Finished,
}

impl EngineState {
    /// Returns the only state this one may move to, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Running),
            Self::Running => Some(Self::Draining),
            Self::Draining => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns true if the engine has stopped handing out new work
    pub fn is_stopping(&self) -> bool {
        matches!(self, Self::Draining | Self::Finished)
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Draining => 2,
            Self::Finished => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Finished,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// Atomic cell holding an [`EngineState`]
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: EngineState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to its successor
    ///
    /// Fails with the state actually observed when another caller got there
    /// first, which makes every transition happen exactly once.
    pub fn advance(&self, from: EngineState) -> Result<EngineState, EngineState> {
        let to = from.next().ok_or(from)?;
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| to)
            .map_err(EngineState::from_u8)
    }
}

/// Per-run counters, each an independent atomic
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub pages_fetched: AtomicU64,
    pub bytes_fetched: AtomicU64,
    pub errors: AtomicU64,
    /// Every href seen on fetched pages, duplicates included
    pub links_discovered: AtomicU64,
    pub links_enqueued: AtomicU64,
    pub links_off_domain: AtomicU64,
    pub links_invalid: AtomicU64,
}

impl CrawlCounters {
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Acquire)
    }

    /// Records one successful fetch and returns the new page total
    pub fn record_page(&self, bytes: u64) -> u64 {
        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
        self.pages_fetched.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Aggregate statistics reported when a crawl finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub duration: Duration,
    pub pages_fetched: u64,
    pub bytes_fetched: u64,
    pub errors: u64,
    pub links_discovered: u64,
    pub links_enqueued: u64,
    pub links_off_domain: u64,
    pub links_invalid: u64,
    /// URLs still pending when the crawl stopped
    pub frontier_len: usize,
    /// Cardinality of the uniqueness gate, preloaded URLs included
    pub unique_urls: usize,
}

impl CrawlReport {
    pub fn from_counters(
        counters: &CrawlCounters,
        duration: Duration,
        frontier_len: usize,
        unique_urls: usize,
    ) -> Self {
        Self {
            duration,
            pages_fetched: CrawlCounters::load(&counters.pages_fetched),
            bytes_fetched: CrawlCounters::load(&counters.bytes_fetched),
            errors: CrawlCounters::load(&counters.errors),
            links_discovered: CrawlCounters::load(&counters.links_discovered),
            links_enqueued: CrawlCounters::load(&counters.links_enqueued),
            links_off_domain: CrawlCounters::load(&counters.links_off_domain),
            links_invalid: CrawlCounters::load(&counters.links_invalid),
            frontier_len,
            unique_urls,
        }
    }

    /// Pages per second over the whole run
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.pages_fetched as f64 / secs
        } else {
            0.0
        }
    }
}
