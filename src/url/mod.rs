//! URL handling for Umbra
//!
//! Canonicalization for deduplication, plus the host check used to keep a
//! crawl on the seed's site.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Returns true if both URLs point at the same host and port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use umbra_crawler::url::same_host;
///
/// let a = Url::parse("http://example.onion/a").unwrap();
/// let b = Url::parse("http://EXAMPLE.onion/b?x=1").unwrap();
/// assert!(same_host(&a, &b));
/// ```
pub fn same_host(a: &Url, b: &Url) -> bool {
    let host_a = a.host_str().map(str::to_lowercase);
    let host_b = b.host_str().map(str::to_lowercase);
    host_a.is_some() && host_a == host_b && a.port_or_known_default() == b.port_or_known_default()
}

/// Returns the last path segment of a URL, if any
pub fn file_name(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
}
