//! URL utilities for consistent scheduling behavior across modules.

use url::Url;

pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

/// Canonicalize a URL for fingerprinting.
///
/// Parsing through the `url` crate lowercases the scheme and host and omits
/// default ports; the fragment is stripped because it never reaches the
/// server. Query parameter order is preserved as-is, since reordering can
/// change semantics for some endpoints.
///
/// Unparseable input is returned verbatim so the fingerprint stays
/// deterministic either way.
pub fn canonicalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// Map a domain identifier to a filesystem-safe directory name.
///
/// Hostnames are already close to safe; anything outside alphanumerics,
/// '.', '-' and '_' is replaced so explicit domain overrides cannot escape
/// the queue directory.
pub fn fs_safe_domain(domain: &str) -> String {
    domain
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(
            extract_host("https://example.com/path"),
            Some("example.com".to_string())
        );
        assert_eq!(extract_host("invalid"), None);
    }

    #[test]
    fn test_canonicalize_lowercases_and_strips_default_port() {
        assert_eq!(
            canonicalize_url("HTTPS://Example.COM:443/Path?b=2&a=1"),
            "https://example.com/Path?b=2&a=1"
        );
    }

    #[test]
    fn test_canonicalize_strips_fragment() {
        assert_eq!(
            canonicalize_url("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_canonicalize_preserves_query_order() {
        assert_eq!(
            canonicalize_url("https://example.com/?z=1&a=2"),
            "https://example.com/?z=1&a=2"
        );
    }

    #[test]
    fn test_fs_safe_domain() {
        assert_eq!(fs_safe_domain("example.com"), "example.com");
        assert_eq!(fs_safe_domain("shop/../etc"), "shop_.._etc");
    }
}
