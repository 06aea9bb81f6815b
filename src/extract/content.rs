// src/extract/content.rs
// =============================================================================
// Pulls the readable text out of a page.
//
// Only text sitting directly inside a "content" tag counts:
//   p, h1-h6, code, pre
// Navigation menus, scripts, footers full of <span>s and so on are left out.
//
// The text is then squashed into a simple normalized form:
// - every run of characters other than A-Z a-z 0-9 . , ? ! becomes one space
// - everything is lowercased
// =============================================================================

use regex::Regex;
use scraper::{ElementRef, Node};
use std::sync::LazyLock;

pub const CONTENT_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "code", "pre"];

static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9.,?!]+").expect("noise pattern is a valid regex"));

pub fn extract_content(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let document = super::parse(content);
    let mut text = String::new();

    // descendants() walks the tree in document order
    for node in document.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };

        let in_content_tag = node
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(|parent| CONTENT_TAGS.contains(&parent.value().name()));

        if in_content_tag {
            text.push_str(chunk);
        }
    }

    NOISE.replace_all(&text, " ").to_lowercase()
}
