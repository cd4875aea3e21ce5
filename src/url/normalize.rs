use crate::{UrlError, UrlResult};
use sha2::{Digest, Sha256};
use url::Url;

/// Query keys starting with any of these (case-insensitive) are dropped
const TRACKING_PREFIXES: &[&str] = &["utm_", "fbclid", "gclid", "mc_", "ref", "source", "campaign"];

/// Normalizes a URL into the canonical form used for dedup
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or empty
/// 2. Reject anything that is not http/https or has no host
/// 3. Lowercase scheme and host (done by the parser for http/https)
/// 4. Collapse runs of `/` in the path; an empty path becomes `/`
/// 5. Remove the fragment
/// 6. Drop tracking query parameters, keeping the others in their original order
/// 7. Remove an empty query string
///
/// The operation is idempotent: normalizing a normalized URL is a no-op.
///
/// # Examples
///
/// ```
/// use site_pipeline::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM//a//b?utm_source=x&id=5#top").unwrap();
/// assert_eq!(url, "https://example.com/a/b?id=5");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<String> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let path = collapse_slashes(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.set_query(None);
        if !kept.is_empty() {
            url.query_pairs_mut().extend_pairs(kept);
        }
    }

    Ok(url.to_string())
}

/// SHA-256 hex digest of an already-normalized URL
pub fn url_hash(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Collapses repeated slashes; an empty path becomes the root
fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len().max(1));
    let mut previous_slash = false;

    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        collapsed.push(c);
    }

    if collapsed.is_empty() {
        collapsed.push('/');
    }
    collapsed
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    TRACKING_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}
