//! Fetch workers
//!
//! Each worker takes URLs from the shared intake, waits for a rate limiter
//! permit, fetches and persists the page, then feeds admissible links back
//! into the frontier.

use crate::crawler::context::CrawlContext;
use crate::crawler::rate_limiter::RateLimiter;
use crate::url::{canonicalize, is_on_domain, resolve_link};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use url::Url;

/// Receiving end of the intake channel, shared by all workers
pub(crate) type SharedIntake = Arc<Mutex<mpsc::Receiver<String>>>;

/// How often a progress line is logged, in pages
const PROGRESS_EVERY: u64 = 10;

/// Runs one worker until the intake is closed and drained
pub(crate) async fn run_worker(
    id: usize,
    ctx: Arc<CrawlContext>,
    limiter: Arc<RateLimiter>,
    intake: SharedIntake,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        let next = intake.lock().await.recv().await;
        let Some(url) = next else {
            break;
        };
        let _ticket = ctx.receive_ticket();

        if ctx.should_stop() {
            tracing::debug!("Worker {} dropping {}: crawl is stopping", id, url);
            continue;
        }

        limiter.acquire().await;

        // The budget may have been crossed while this worker queued for a permit
        if ctx.should_stop() {
            tracing::debug!("Worker {} dropping {}: crawl is stopping", id, url);
            continue;
        }

        process_url(&ctx, &url).await;
    }

    tracing::debug!("Worker {} exiting", id);
}

/// Fetches one URL and enqueues what it links to
async fn process_url(ctx: &CrawlContext, url: &str) {
    let target = match Url::parse(url) {
        Ok(target) => target,
        Err(e) => {
            ctx.counters.record_error();
            tracing::error!("Frontier held unparseable URL {}: {}", url, e);
            return;
        }
    };

    tracing::debug!("Fetching {}", target);

    let page = match ctx.fetcher.fetch(&target).await {
        Ok(page) => page,
        Err(e) => {
            ctx.counters.record_error();
            tracing::error!("Failed to fetch {}: {}", target, e);
            return;
        }
    };

    if !page.is_success() {
        tracing::warn!("{} returned HTTP {}", target, page.status_code);
    }

    // A redirect target is as good as visited
    let landed = canonicalize(page.url.clone());
    if landed != target && ctx.gate.is_unique(landed.as_str()) {
        tracing::debug!("{} redirected to {}", target, landed);
    }

    let fetched = ctx.counters.record_page(page.bytes());
    if fetched % PROGRESS_EVERY == 0 {
        tracing::info!(
            "Progress: {} pages fetched, {} in frontier, {} unique URLs",
            fetched,
            ctx.frontier.len(),
            ctx.gate.count()
        );
    }

    if !page.is_html() {
        tracing::debug!(
            "Not extracting links from {} ({})",
            page.url,
            page.content_type.as_deref().unwrap_or("unknown type")
        );
        return;
    }

    let hrefs = ctx.extractor.extract_links(&page.url, &page.body);
    let enqueued = admit_links(ctx, &page.url, hrefs);
    tracing::debug!("{} new URLs enqueued from {}", enqueued, page.url);
}

/// Resolves hrefs against `base` and pushes the on-domain, never-seen ones
///
/// Returns how many URLs were enqueued.
pub(crate) fn admit_links<I>(ctx: &CrawlContext, base: &Url, hrefs: I) -> usize
where
    I: IntoIterator<Item = String>,
{
    let mut admitted = Vec::new();

    for href in hrefs {
        ctx.counters.links_discovered.fetch_add(1, Ordering::Relaxed);

        let Some(resolved) = resolve_link(base, &href) else {
            ctx.counters.links_invalid.fetch_add(1, Ordering::Relaxed);
            continue;
        };

        if !is_on_domain(&ctx.target_domain, &resolved) {
            ctx.counters.links_off_domain.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        let resolved = String::from(resolved);
        if ctx.gate.is_unique(&resolved) {
            admitted.push(resolved);
        }
    }

    let count = admitted.len();
    ctx.counters
        .links_enqueued
        .fetch_add(count as u64, Ordering::Relaxed);
    ctx.frontier.extend(admitted);
    count
}
