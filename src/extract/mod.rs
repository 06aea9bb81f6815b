// src/extract/mod.rs
// =============================================================================
// This module turns raw HTML into the two things the crawler cares about.
//
// Submodules:
// - links: every <a href> on the page, resolved to an absolute URL
// - content: the readable text of the page, normalized for storage
//
// Both are pure functions: no network, no database, no shared state.
// That makes them easy to test and safe to call from any worker.
// =============================================================================

mod content;
mod links;

pub use content::extract_content;
pub use links::extract_links;

use scraper::Html;

// Parses a page and logs whatever the parser had to repair.
//
// html5ever never gives up on bad markup. It fixes it up and records what
// it fixed, so "malformed" pages still produce a (possibly odd) tree.
fn parse(content: &str) -> Html {
    let document = Html::parse_document(content);
    if !document.errors.is_empty() {
        tracing::debug!("Recovered from {} HTML parse error(s)", document.errors.len());
    }
    document
}
