use std::collections::HashSet;
use url::Url;

/// Returns the network location of a URL: lowercase host plus explicit port
///
/// Default ports are omitted by the URL parser, so `https://example.com:443/`
/// and `https://example.com/` yield the same value.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_pipeline::url::netloc;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(netloc(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(netloc(&url), Some("localhost:8080".to_string()));
/// ```
pub fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Strips a leading `www.` from a host
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Whether a host (or its `www.`-stripped form) is in the allow-list
pub fn is_allowed_host(host: &str, allowed: &HashSet<String>) -> bool {
    allowed.contains(host) || allowed.contains(strip_www(host))
}
