// src/extract/links.rs
// =============================================================================
// This module extracts outbound links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to resolve relative hrefs against the page URL.
//
// About the depth budget:
// - It's the number of link hops the crawler may still follow from this page
// - A budget of 0 means "this page is a leaf": we don't look for links at all
// - Otherwise the whole document is scanned, however deeply an anchor is
//   nested. The budget has nothing to do with how deep the DOM is.
// =============================================================================

use scraper::Selector;
use std::sync::LazyLock;
use url::Url;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("'a[href]' is a valid selector"));

// Extracts all links from HTML content
//
// Parameters:
//   content: the HTML content to parse
//   base_url: the URL of the page (for resolving relative links)
//   depth_budget: link hops left; 0 returns nothing
//
// Returns: absolute http(s) URLs, in document order, duplicates kept
//
// Example:
//   content = "<a href='/docs'>Docs</a>"
//   base_url = "https://example.com"
//   result = ["https://example.com/docs"]
pub fn extract_links(content: &str, base_url: &str, depth_budget: u32) -> Vec<String> {
    if depth_budget == 0 {
        return Vec::new();
    }

    let base = match Url::parse(base_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Invalid base URL {}: {}", base_url, e);
            return Vec::new();
        }
    };

    let document = super::parse(content);

    let links: Vec<String> = document
        .select(&ANCHOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(&base, href))
        .filter(|url| is_crawlable(url))
        .map(String::from)
        .collect();

    tracing::debug!("Extracted {} links from {}", links.len(), base_url);
    links
}

// Resolves a possibly-relative href against the page URL
//
// Absolute hrefs come back as-is (normalized by the url crate), relative ones
// are joined the way a browser would. Hrefs that can't be joined are skipped.
fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    match base.join(href.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!("Skipping href '{}' on {}: {}", href, base, e);
            None
        }
    }
}

// The fetcher only speaks HTTP, so mailto:, javascript:, tel:, data: and
// friends would just turn into fetch errors
fn is_crawlable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "<html><body><p>No links here.</p></body></html>",
        "http://example.com",
        vec![]
    )]
    #[case(
        r#"<a href="https://www.rust-lang.org">Rust</a>"#,
        "https://example.com",
        vec!["https://www.rust-lang.org/"]
    )]
    #[case(
        r#"<a href="/docs">Docs</a>"#,
        "https://example.com/page",
        vec!["https://example.com/docs"]
    )]
    #[case(
        r#"<a href="../about">About</a><a href="page?q=1#top">Query</a>"#,
        "https://example.com/a/b/current.html",
        vec!["https://example.com/a/about", "https://example.com/a/b/page?q=1#top"]
    )]
    #[case(
        r#"<a href="mailto:test@example.com">Email</a><a href="javascript:void(0)">JS</a>"#,
        "https://example.com",
        vec![]
    )]
    #[case(
        r#"<a href="http://[::1]:namedport">Malformed</a><a href="/ok">Ok</a>"#,
        "https://example.com",
        vec!["https://example.com/ok"]
    )]
    #[case(
        r#"<a name="anchor-without-href">Nothing</a>"#,
        "https://example.com",
        vec![]
    )]
    #[case("", "https://example.com", vec![])]
    fn test_extract_links(
        #[case] html: &str,
        #[case] base_url: &str,
        #[case] expected: Vec<&str>,
    ) {
        let links = extract_links(html, base_url, 1);
        assert_eq!(links, expected, "base_url: {}", base_url);
    }

    #[test]
    fn test_zero_budget_returns_nothing() {
        let html = r#"<a href="/docs">Docs</a>"#;
        assert!(extract_links(html, "https://example.com", 0).is_empty());
    }

    #[test]
    fn test_budget_does_not_limit_dom_depth() {
        // Six levels of nesting, budget of one hop
        let html = r#"
            <html><body><div><section><ul><li>
                <a href="/deep">Deep</a>
            </li></ul></section></div></body></html>
        "#;
        let links = extract_links(html, "https://example.com", 1);
        assert_eq!(links, vec!["https://example.com/deep"]);
    }

    #[test]
    fn test_invalid_base_url() {
        let html = r#"<a href="/docs">Docs</a>"#;
        assert!(extract_links(html, "not a url", 3).is_empty());
    }

    #[test]
    fn test_unclosed_tags_still_yield_links() {
        let html = r#"<div><p><a href="/one">one<a href="/two">two</div></p>"#;
        let links = extract_links(html, "https://example.com", 1);
        assert_eq!(links, vec!["https://example.com/one", "https://example.com/two"]);
    }

    #[test]
    fn test_keeps_duplicates_in_document_order() {
        let html = r#"<a href="/b">b</a><a href="/a">a</a><a href="/b">b again</a>"#;
        let links = extract_links(html, "https://example.com", 2);
        assert_eq!(
            links,
            vec![
                "https://example.com/b",
                "https://example.com/a",
                "https://example.com/b",
            ]
        );
    }
}
