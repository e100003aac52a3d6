//! HTML link extraction
//!
//! This module pulls candidate hrefs out of fetched pages:
//! - `<a href="...">` anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! Hrefs come back raw. Resolution, canonicalization and scope checks are the
//! worker's job, so every discovered link is counted once, valid or not.

use scraper::{Html, Selector};
use url::Url;

/// Extracts candidate hrefs from page content
pub trait LinkExtractor: Send + Sync {
    /// Returns hrefs in document order, duplicates included
    fn extract_links(&self, base: &Url, content: &str) -> Vec<String>;
}

/// [`LinkExtractor`] for HTML documents, built on `scraper`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags in body, nav, header, footer
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<link rel="stylesheet" ...>`
/// - `<script src="...">`
/// - `<img src="...">`
/// - `<a href="..." download>`
///
/// `rel="nofollow"` links are followed.
///
/// When the document declares `<base href>`, relative hrefs are joined onto it
/// and returned absolute, since the page URL is no longer their base.
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    anchors: Selector,
    canonical: Selector,
    base: Selector,
}

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self {
            anchors: parse_selector("a[href]"),
            canonical: parse_selector("link[rel='canonical'][href]"),
            base: parse_selector("base[href]"),
        }
    }

    /// The `<base href>` of the document, resolved against the page URL
    fn document_base(&self, document: &Html, page: &Url) -> Option<Url> {
        let href = document
            .select(&self.base)
            .next()?
            .value()
            .attr("href")?;
        page.join(href.trim()).ok()
    }
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, base: &Url, content: &str) -> Vec<String> {
        let document = Html::parse_document(content);
        let document_base = self.document_base(&document, base);

        let anchors = document
            .select(&self.anchors)
            .filter(|element| element.value().attr("download").is_none())
            .filter_map(|element| element.value().attr("href"));
        let canonical = document
            .select(&self.canonical)
            .filter_map(|element| element.value().attr("href"));

        anchors
            .chain(canonical)
            .map(|href| match &document_base {
                Some(doc_base) => doc_base
                    .join(href.trim())
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            })
            .collect()
    }
}

fn parse_selector(selector: &str) -> Selector {
    // Selectors are compile-time literals
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {}: {:?}", selector, e))
}
