use url::Url;

/// Schemes that can never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Returns the canonical form of a URL: the same URL without its fragment
///
/// Two URLs that differ only by fragment are the same page, so everything that
/// is deduplicated, enqueued or fetched goes through here first.
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Resolves a link href against the page it was found on
///
/// Resolution follows RFC 3986 (`Url::join`): absolute, scheme-relative,
/// root-relative and path-relative hrefs including `.` and `..` segments.
/// The result is canonical (fragment stripped).
///
/// Returns None, never an error, when the link cannot lead anywhere crawlable:
/// - empty hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - hrefs that fail to parse
/// - anything that resolves to a scheme other than http or https
///
/// # Examples
///
/// ```
/// use url::Url;
/// use domain_crawler::url::resolve_link;
///
/// let base = Url::parse("https://example.com/products/main.html").unwrap();
/// let resolved = resolve_link(&base, "../support#faq").unwrap();
/// assert_eq!(resolved.as_str(), "https://example.com/support");
/// ```
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        tracing::debug!("Skipping non-navigational link {}", href);
        return None;
    }

    match base.join(href) {
        Ok(resolved) if resolved.scheme() == "http" || resolved.scheme() == "https" => {
            Some(canonicalize(resolved))
        }
        Ok(resolved) => {
            tracing::debug!("Skipping {} link {}", resolved.scheme(), href);
            None
        }
        Err(e) => {
            tracing::warn!("Could not resolve {} against {}: {}", href, base, e);
            None
        }
    }
}
