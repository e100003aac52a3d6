//! URL handling module
//!
//! This module provides domain extraction, the subdomain-inclusive domain scope
//! check, and link resolution into canonical (fragment-free) absolute URLs.

mod domain;
mod resolve;

// Re-export main functions
pub use domain::{extract_domain, is_on_domain, normalize_host};
pub use resolve::{canonicalize, resolve_link};

use crate::UrlError;
use url::Url;

/// Parses the crawl's start URL and derives the target domain from it
///
/// The start URL is canonicalized like any discovered link. Failure here is
/// fatal to session construction.
///
/// # Examples
///
/// ```
/// use domain_crawler::url::parse_start_url;
///
/// let (url, domain) = parse_start_url("https://Example.com/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
/// assert_eq!(domain, "example.com");
/// ```
pub fn parse_start_url(start_url: &str) -> Result<(Url, String), UrlError> {
    let url = Url::parse(start_url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
    Ok((canonicalize(url), domain))
}
