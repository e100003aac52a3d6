//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UniquenessGate`: the seen set deciding which URLs may enter the frontier
//! - `EngineState`: lifecycle of the crawl engine (idle, running, draining, finished)
//! - `CrawlCounters` / `CrawlReport`: per-run statistics

mod seen;
mod session;

// Re-export main types
pub use seen::UniquenessGate;
pub use session::{CrawlCounters, CrawlReport, EngineState, StateCell};
