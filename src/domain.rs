/// Page URL helpers
use url::Url;

/// Hostname of the page a clip came from, as the backend stores it.
/// Lowercase, no port. `None` when the URL cannot be parsed or has no host
/// (e.g. `about:blank`).
pub fn page_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str().map(|host| host.to_lowercase())
}

/// Pages the extension cannot clip from (browser-internal surfaces).
pub fn is_restricted_page(url: &str) -> bool {
    url.starts_with("chrome://")
        || url.starts_with("chrome-extension://")
        || url.starts_with("about:")
}
