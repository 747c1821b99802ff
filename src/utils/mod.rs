// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;
pub mod time;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// `scheme://host[:port]` followed by `path`.
pub fn origin_with_path(url: &Url, path: &str) -> String {
    let mut out = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    out.push_str(path);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
        assert_eq!(resolve("not a url", "x"), None);
    }

    #[test]
    fn test_origin_with_path() {
        let url = Url::parse("https://bbs.example:8443/test/bbs.cgi").unwrap();
        assert_eq!(
            origin_with_path(&url, "/test/read.cgi/eq/1/"),
            "https://bbs.example:8443/test/read.cgi/eq/1/"
        );
    }
}
