use serde::Deserialize;

/// Default per-request timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Default dispatcher backoff when the frontier is empty or intake is full
pub const DEFAULT_IDLE_BACKOFF_MS: u64 = 250;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from; its host becomes the target domain
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum number of successfully fetched pages
    #[serde(rename = "page-limit")]
    pub page_limit: u64,

    /// Number of concurrent fetch workers
    pub workers: u32,

    /// Interval between two fetch permits, shared by all workers (milliseconds)
    #[serde(rename = "rate-interval-ms")]
    pub rate_interval_ms: u64,

    /// Wall-clock limit for a single fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Capacity of the dispatcher-to-worker channel; defaults to twice the worker count
    #[serde(rename = "intake-capacity", default)]
    pub intake_capacity: Option<usize>,

    /// How long the dispatcher backs off when it has nothing to hand out (milliseconds)
    #[serde(rename = "idle-backoff-ms", default = "default_idle_backoff")]
    pub idle_backoff_ms: u64,
}

impl CrawlerConfig {
    /// Effective intake channel capacity
    pub fn effective_intake_capacity(&self) -> usize {
        self.intake_capacity
            .unwrap_or_else(|| (self.workers as usize).saturating_mul(2))
            .max(1)
    }
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_idle_backoff() -> u64 {
    DEFAULT_IDLE_BACKOFF_MS
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
