//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests to fetch page content
//! - Persisting every response into the page store
//! - Error classification (timeouts vs. other transport failures)

use crate::config::{Config, UserAgentConfig};
use crate::storage::{SaveOutcome, SqliteStorage, Storage, StorageError};
use crate::CrawlerError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single fetch
const MAX_REDIRECTS: usize = 10;

/// A page returned by a [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects, used as the base for relative links
    pub url: Url,
    pub status_code: u16,
    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// Body size in bytes
    pub fn bytes(&self) -> u64 {
        self.body.len() as u64
    }

    /// Returns true when links should be extracted from this page
    ///
    /// Pages without a Content-Type are treated as HTML.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(content_type) => {
                let content_type = content_type.to_ascii_lowercase();
                content_type.contains("text/html") || content_type.contains("xhtml")
            }
            None => true,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Fetches one URL and persists the result
///
/// Implementations must be callable from many workers at once.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlerError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use domain_crawler::config::UserAgentConfig;
/// use domain_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "DomainCrawler".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(60)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by reqwest and the SQLite page store
pub struct HttpFetcher {
    client: Client,
    storage: Arc<Mutex<SqliteStorage>>,
}

impl HttpFetcher {
    pub fn new(client: Client, storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self { client, storage }
    }

    /// Builds the client from the crawler configuration
    pub fn from_config(
        config: &Config,
        storage: Arc<Mutex<SqliteStorage>>,
    ) -> Result<Self, CrawlerError> {
        let timeout = Duration::from_secs(config.crawler.fetch_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        Ok(Self::new(client, storage))
    }

    fn classify(url: &Url, error: reqwest::Error) -> CrawlerError {
        if error.is_timeout() {
            CrawlerError::Timeout {
                url: url.to_string(),
            }
        } else {
            CrawlerError::Http {
                url: url.to_string(),
                source: error,
            }
        }
    }

    fn persist(&self, url: &Url, body: &str, status_code: u16) -> Result<(), CrawlerError> {
        let mut storage = self.storage.lock().map_err(|_| StorageError::Poisoned)?;
        match storage.save_page(url.as_str(), body, status_code)? {
            SaveOutcome::Inserted => {}
            SaveOutcome::AlreadyStored => {
                tracing::debug!("Page {} already stored, keeping existing row", url);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlerError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| Self::classify(url, e))?;

        self.persist(url, &body, status.as_u16())?;

        Ok(FetchedPage {
            url: final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        })
    }
}
