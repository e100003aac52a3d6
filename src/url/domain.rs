use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL, lowercases it and drops a
/// single trailing dot so `Example.COM.` and `example.com` compare equal.
/// If the URL has no host it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use domain_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com./path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .map(normalize_host)
        .filter(|host| !host.is_empty())
}

/// Lowercases a hostname and strips one trailing dot
pub fn normalize_host(host: &str) -> String {
    let host = host.strip_suffix('.').unwrap_or(host);
    host.to_ascii_lowercase()
}

/// Decides whether `candidate` lies within the crawl's target domain
///
/// True iff the candidate's host equals `target_domain` or ends with
/// `"." + target_domain`. Both sides go through [`normalize_host`] first.
/// URLs without a host are never on domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use domain_crawler::url::is_on_domain;
///
/// let inside = Url::parse("https://blog.example.com/post").unwrap();
/// let outside = Url::parse("https://example.com.evil.com/").unwrap();
/// assert!(is_on_domain("example.com", &inside));
/// assert!(!is_on_domain("example.com", &outside));
/// ```
pub fn is_on_domain(target_domain: &str, candidate: &Url) -> bool {
    let target = normalize_host(target_domain);
    if target.is_empty() {
        return false;
    }

    let Some(host) = extract_domain(candidate) else {
        return false;
    };

    host == target
        || host
            .strip_suffix(target.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}
