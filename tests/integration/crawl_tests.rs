//! Integration tests for the crawler
//!
//! The engine tests plug in-process fetchers into the coordinator; the last
//! tests use wiremock to create mock HTTP servers and run the full crawl
//! cycle end-to-end through reqwest and SQLite.

use async_trait::async_trait;
use domain_crawler::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use domain_crawler::crawler::{
    crawl, Coordinator, CrawlSettings, FetchedPage, HtmlLinkExtractor, PageFetcher,
};
use domain_crawler::state::{EngineState, UniquenessGate};
use domain_crawler::storage::{RunStatus, SqliteStorage, Storage};
use domain_crawler::CrawlerError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type PageFn = dyn Fn(&Url) -> Option<String> + Send + Sync;

/// Serves HTML produced by a closure and records every fetched URL
///
/// A `None` from the closure is reported as a timeout.
struct ScriptedFetcher {
    page: Box<PageFn>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn new<F>(page: F) -> Arc<Self>
    where
        F: Fn(&Url) -> Option<String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            page: Box::new(page),
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlerError> {
        self.fetched.lock().unwrap().push(url.to_string());
        // Give other workers a chance to interleave
        tokio::time::sleep(Duration::from_millis(2)).await;

        match (self.page)(url) {
            Some(body) => Ok(FetchedPage {
                url: url.clone(),
                status_code: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body,
            }),
            None => Err(CrawlerError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

fn links(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

fn fast_settings(page_limit: u64, workers: usize) -> CrawlSettings {
    CrawlSettings::new("https://example.com/", page_limit)
        .with_workers(workers)
        .with_rate_interval(Duration::from_millis(5))
        .with_idle_backoff(Duration::from_millis(5))
}

fn coordinator(
    settings: CrawlSettings,
    fetcher: Arc<ScriptedFetcher>,
    gate: Arc<UniquenessGate>,
) -> Coordinator {
    Coordinator::new(settings, fetcher, Arc::new(HtmlLinkExtractor::new()), gate)
        .expect("Failed to build coordinator")
}

async fn run_with_deadline(coordinator: &Coordinator) -> domain_crawler::CrawlReport {
    tokio::time::timeout(Duration::from_secs(20), coordinator.run())
        .await
        .expect("crawl did not terminate")
        .expect("crawl failed")
}

#[tokio::test]
async fn test_budget_terminates_infinite_site() {
    // Every page links to two deeper pages: the frontier never runs dry
    let fetcher = ScriptedFetcher::new(|url| {
        let n: u64 = url.path().trim_start_matches("/p/").parse().unwrap_or(1);
        let (left, right) = (format!("/p/{}", n * 2), format!("/p/{}", n * 2 + 1));
        Some(links(&[left.as_str(), right.as_str()]))
    });

    let workers = 3;
    let budget = 5;
    let coordinator = coordinator(
        fast_settings(budget, workers),
        Arc::clone(&fetcher),
        Arc::new(UniquenessGate::new()),
    );

    let report = run_with_deadline(&coordinator).await;

    assert_eq!(coordinator.state(), EngineState::Finished);
    assert!(report.pages_fetched >= budget);
    assert!(report.pages_fetched <= budget + workers as u64 - 1);
    assert!(report.frontier_len > 0);
}

#[tokio::test]
async fn test_start_page_with_budget_one() {
    let fetcher = ScriptedFetcher::new(|url| match url.path() {
        "/" => Some(links(&[
            "/about-us",
            "https://external.org/page",
            "products/item#details",
        ])),
        _ => Some(links(&[])),
    });

    let coordinator = coordinator(
        fast_settings(1, 3),
        Arc::clone(&fetcher),
        Arc::new(UniquenessGate::new()),
    );
    let report = run_with_deadline(&coordinator).await;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(fetcher.fetched(), vec!["https://example.com/"]);
    assert_eq!(
        coordinator.frontier_snapshot(),
        vec![
            "https://example.com/about-us",
            "https://example.com/products/item",
        ]
    );
    assert_eq!(report.links_discovered, 3);
    assert_eq!(report.links_enqueued, 2);
    assert_eq!(report.links_off_domain, 1);
    assert!(!coordinator.gate().contains("https://external.org/page"));
}

#[tokio::test]
async fn test_preloaded_urls_are_never_fetched() {
    let fetcher = ScriptedFetcher::new(|url| match url.path() {
        "/" => Some(links(&["/a", "/b", "/c"])),
        "/b" => Some(links(&["/from-b"])),
        _ => Some(links(&["/"])),
    });

    let gate = Arc::new(UniquenessGate::with_preloaded(vec![
        "https://example.com/b",
    ]));
    let coordinator = coordinator(fast_settings(100, 2), Arc::clone(&fetcher), gate);
    let report = run_with_deadline(&coordinator).await;

    let fetched: HashSet<_> = fetcher.fetched().into_iter().collect();
    assert!(!fetched.contains("https://example.com/b"));
    assert!(!fetched.contains("https://example.com/from-b"));
    assert_eq!(
        fetched,
        HashSet::from([
            "https://example.com/".to_string(),
            "https://example.com/a".to_string(),
            "https://example.com/c".to_string(),
        ])
    );
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.frontier_len, 0);
}

#[tokio::test]
async fn test_exhausted_site_terminates() {
    let fetcher = ScriptedFetcher::new(|url| match url.as_str() {
        "https://example.com/" => Some(links(&["/a"])),
        "https://example.com/a" => Some(links(&["/b", "/"])),
        "https://example.com/b" => Some(links(&["/a", "https://blog.example.com/"])),
        _ => Some(links(&[])),
    });

    let coordinator = coordinator(
        fast_settings(1_000, 3),
        Arc::clone(&fetcher),
        Arc::new(UniquenessGate::new()),
    );
    let report = run_with_deadline(&coordinator).await;

    // Subdomains are in scope
    assert_eq!(report.pages_fetched, 4);
    assert_eq!(report.unique_urls, 4);
    assert_eq!(report.frontier_len, 0);
    assert_eq!(coordinator.state(), EngineState::Finished);
}

#[tokio::test]
async fn test_fetch_errors_do_not_abort_crawl() {
    let fetcher = ScriptedFetcher::new(|url| match url.path() {
        "/" => Some(links(&["/broken", "/ok"])),
        "/broken" => None,
        _ => Some(links(&[])),
    });

    let coordinator = coordinator(
        fast_settings(100, 2),
        Arc::clone(&fetcher),
        Arc::new(UniquenessGate::new()),
    );
    let report = run_with_deadline(&coordinator).await;

    assert_eq!(report.errors, 1);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(fetcher.fetched().len(), 3);
}

#[tokio::test]
async fn test_each_url_fetched_once_under_contention() {
    // Every page links to every other page
    let hrefs: Vec<String> = (0..20).map(|i| format!("/page/{}", i)).collect();
    let body = links(&hrefs.iter().map(String::as_str).collect::<Vec<_>>());
    let fetcher = ScriptedFetcher::new(move |_| Some(body.clone()));

    let coordinator = coordinator(
        fast_settings(1_000, 4),
        Arc::clone(&fetcher),
        Arc::new(UniquenessGate::new()),
    );
    let report = run_with_deadline(&coordinator).await;

    let fetched = fetcher.fetched();
    let distinct: HashSet<_> = fetched.iter().collect();
    assert_eq!(fetched.len(), distinct.len());
    assert_eq!(report.pages_fetched, 21);
    assert_eq!(report.links_discovered, 21 * 20);
    assert_eq!(report.links_enqueued, 20);
}

#[tokio::test]
async fn test_run_twice_is_rejected() {
    let fetcher = ScriptedFetcher::new(|_| Some(links(&[])));
    let coordinator = coordinator(
        fast_settings(10, 1),
        fetcher,
        Arc::new(UniquenessGate::new()),
    );

    run_with_deadline(&coordinator).await;
    assert!(matches!(
        coordinator.run().await,
        Err(CrawlerError::InvalidTransition { .. })
    ));
}

/// Creates a test configuration pointing at a mock server
fn create_test_config(start_url: &str, db_path: &Path, page_limit: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: start_url.to_string(),
            page_limit,
            workers: 2,
            rate_interval_ms: 10, // Very short for testing
            fetch_timeout_secs: 5,
            intake_capacity: None,
            idle_backoff_ms: 10,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
        },
    }
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html"),
        )
        .mount(server)
        .await;
}

async fn small_site() -> MockServer {
    let mock_server = MockServer::start().await;

    mount_html(
        &mock_server,
        "/",
        links(&["/page1", "/page2#top", "http://other.invalid/"]),
    )
    .await;
    mount_html(&mock_server, "/page1", links(&["/", "/missing"])).await;
    mount_html(&mock_server, "/page2", links(&["/page1", "mailto:a@b.c"])).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&mock_server)
        .await;

    mock_server
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = small_site().await;
    let base_url = mock_server.uri();

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");
    let config = create_test_config(&format!("{}/", base_url), &db_path, 100);

    let report = crawl(config, "test-hash", false)
        .await
        .expect("Crawl failed");

    // /, /page1, /page2 and the 404 page are all fetched and stored
    assert_eq!(report.pages_fetched, 4);
    assert_eq!(report.errors, 0);
    assert_eq!(report.links_off_domain, 1);
    assert_eq!(report.links_invalid, 1);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    assert_eq!(storage.count_pages().unwrap(), 4);

    let missing = storage
        .get_page_by_url(&format!("{}/missing", base_url))
        .unwrap()
        .expect("404 page should be stored");
    assert_eq!(missing.status_code, Some(404));

    let run = storage.get_latest_run().unwrap().expect("Run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.totals.pages_fetched, 4);
}

#[tokio::test]
async fn test_second_crawl_skips_stored_pages() {
    let mock_server = small_site().await;
    let start_url = format!("{}/", mock_server.uri());

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    let first = crawl(create_test_config(&start_url, &db_path, 100), "h", false)
        .await
        .unwrap();
    assert_eq!(first.pages_fetched, 4);

    // Hydration marks the start URL as known: nothing left to fetch
    let second = crawl(create_test_config(&start_url, &db_path, 100), "h", false)
        .await
        .unwrap();
    assert_eq!(second.pages_fetched, 0);
    assert_eq!(second.unique_urls, 4);

    // Without hydration everything is fetched again; rows stay unique
    let fresh = crawl(create_test_config(&start_url, &db_path, 100), "h", true)
        .await
        .unwrap();
    assert_eq!(fresh.pages_fetched, 4);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 4);
}

#[tokio::test]
async fn test_crawl_respects_page_limit() {
    let mock_server = small_site().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    let config = create_test_config(&format!("{}/", mock_server.uri()), &db_path, 1);
    let report = crawl(config, "h", false).await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.frontier_len, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 1);
}
