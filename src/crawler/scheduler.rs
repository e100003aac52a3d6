//! Dispatcher: moves URLs from the frontier to the worker intake
//!
//! This module handles:
//! - Page budget enforcement at dispatch time
//! - Backpressure from the bounded intake channel
//! - Termination detection while the frontier is still growing

use crate::crawler::context::CrawlContext;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Why the dispatcher stopped handing out work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The page budget was reached
    BudgetReached,
    /// The crawl was cancelled from outside
    Cancelled,
    /// Frontier empty with nothing in flight
    Exhausted,
    /// Every worker went away
    WorkersGone,
}

/// Runs the dispatch loop until the crawl should drain
///
/// On return the engine is Draining and the intake sender is dropped, which
/// lets each worker finish its current URL and exit.
///
/// Loop order:
/// 1. cancelled or budget reached → stop
/// 2. pop a URL and `try_send` it; a full channel puts the URL back at the
///    head of the frontier and backs off
/// 3. empty frontier → if nothing is in flight and the frontier is still
///    empty, stop; otherwise wait for a push or the idle backoff
pub(crate) async fn dispatch(
    ctx: Arc<CrawlContext>,
    intake: mpsc::Sender<String>,
) -> DispatchOutcome {
    let outcome = loop {
        if ctx.is_cancelled() {
            tracing::info!("Crawl cancelled, no further URLs will be dispatched");
            break DispatchOutcome::Cancelled;
        }
        if ctx.budget_reached() {
            tracing::info!("Page limit of {} reached", ctx.page_limit);
            break DispatchOutcome::BudgetReached;
        }

        match ctx.frontier.pop_front() {
            Some(url) => {
                // A worker may have crossed the budget since the check above
                if ctx.should_stop() {
                    ctx.frontier.push_front(url);
                    continue;
                }
                ctx.mark_dispatched();
                match intake.try_send(url) {
                    Ok(()) => {}
                    Err(TrySendError::Full(url)) => {
                        ctx.unmark_dispatched();
                        ctx.frontier.push_front(url);
                        tokio::time::sleep(ctx.idle_backoff).await;
                    }
                    Err(TrySendError::Closed(url)) => {
                        ctx.unmark_dispatched();
                        ctx.frontier.push_front(url);
                        tracing::warn!("All workers exited before the crawl finished");
                        break DispatchOutcome::WorkersGone;
                    }
                }
            }
            None => {
                // in_flight first: a worker pushes its links before releasing
                // its count, so a zero here means those pushes are visible
                if ctx.in_flight() == 0 && ctx.frontier.is_empty() {
                    tracing::info!("Frontier exhausted with no fetches in flight");
                    break DispatchOutcome::Exhausted;
                }
                let _ = tokio::time::timeout(ctx.idle_backoff, ctx.frontier.notified()).await;
            }
        }
    };

    ctx.begin_draining();
    drop(intake);
    outcome
}
