use std::collections::BTreeSet;
use url::Url;

use crate::locator::{is_network, strip_query};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    Internal,
    External,
}

/// Whether `url` belongs to the site rooted at `site_base`.
pub fn classify(url: &str, site_base: &str) -> LinkScope {
    if url.matches('/').count() < 3 {
        return if site_base.starts_with(strip_query(url)) {
            LinkScope::Internal
        } else {
            LinkScope::External
        };
    }

    // host plus any explicit port, like the authority part of the URL
    let authority = |value: &str| {
        Url::parse(value)
            .ok()
            .and_then(|u| u.host_str().map(|host| (host.to_ascii_lowercase(), u.port())))
    };
    match (authority(url), authority(site_base)) {
        (Some(a), Some(b)) if a == b => LinkScope::Internal,
        _ => LinkScope::External,
    }
}

/// Outbound links seen during one run, split by site.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    internal: BTreeSet<String>,
    external: BTreeSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` if it is an http(s) URL; anything else is ignored.
    pub fn add(&mut self, url: &str, site_base: &str) {
        if !is_network(url) {
            return;
        }
        match classify(url, site_base) {
            LinkScope::Internal => self.internal.insert(url.to_string()),
            LinkScope::External => self.external.insert(url.to_string()),
        };
    }

    pub fn internal(&self) -> impl Iterator<Item = &str> {
        self.internal.iter().map(String::as_str)
    }

    pub fn external(&self) -> impl Iterator<Item = &str> {
        self.external.iter().map(String::as_str)
    }

    /// Base URL first, then sorted internal links, then sorted external
    /// links, without repeats.
    pub fn ordered(&self, site_base: &str) -> Vec<String> {
        let mut links = vec![site_base.to_string()];
        for url in self.internal().chain(self.external()) {
            if !links.iter().any(|seen| seen == url) {
                links.push(url.to_string());
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_is_internal() {
        assert_eq!(classify("http://example.com/b", "http://example.com/a"), LinkScope::Internal);
        assert_eq!(classify("http://other.com/x", "http://example.com/a"), LinkScope::External);
        assert_eq!(classify("https://EXAMPLE.com/c?q=1", "http://example.com/a"), LinkScope::Internal);
    }

    #[test]
    fn test_port_is_part_of_the_site() {
        assert_eq!(classify("http://example.com:8080/x", "http://example.com/a"), LinkScope::External);
        assert_eq!(classify("http://example.com:8080/y", "http://example.com:8080/a"), LinkScope::Internal);
        assert_eq!(classify("http://example.com:80/x", "http://example.com/a"), LinkScope::Internal);
    }

    #[test]
    fn test_degenerate_urls_use_prefix() {
        assert_eq!(classify("http://example.com", "http://example.com/a"), LinkScope::Internal);
        assert_eq!(classify("http://example.com?x=1", "http://example.com/a"), LinkScope::Internal);
        assert_eq!(classify("http://other.com", "http://example.com/a"), LinkScope::External);
    }

    #[test]
    fn test_ordered_output_is_sorted_and_deduplicated() {
        let base = "http://example.com/a";
        let mut links = LinkSet::new();
        for url in [
            "http://other.com/x",
            "http://example.com/z",
            "http://example.com/b",
            "http://example.com/b",
            "http://another.org/",
            "http://example.com/a",
            "mailto:someone@example.com",
            "/relative/path",
        ] {
            links.add(url, base);
        }

        assert_eq!(
            links.ordered(base),
            [
                "http://example.com/a",
                "http://example.com/b",
                "http://example.com/z",
                "http://another.org/",
                "http://other.com/x",
            ]
        );
    }
}
