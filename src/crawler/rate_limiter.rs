//! Global request rate limiter
//!
//! One permit per fixed interval, shared by every worker. The first permit is
//! granted immediately; later callers queue on an async mutex and each waits
//! for the next tick.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Fixed-cadence permit source
#[derive(Debug)]
pub struct RateLimiter {
    ticker: Mutex<Interval>,
}

impl RateLimiter {
    /// Creates a limiter granting one permit per `period`
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        // An idle stretch must not turn into a burst of catch-up permits
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            ticker: Mutex::new(ticker),
        }
    }

    /// Waits until the next permit is available
    pub async fn acquire(&self) {
        let mut ticker = self.ticker.lock().await;
        ticker.tick().await;
    }
}
