// src/ignore.rs
// =============================================================================
// The ignore list: URLs containing any banned substring are never fetched
// and never stored.
//
// The list comes from a plain text file with one pattern per line, e.g.
//
//     ads.
//     doubleclick
//     /login
//
// Matching is a dumb substring test on the whole URL string. "ads." matches
// "http://ads.example.com/x" but also "http://example.com/uploads./x".
// That's intended: the list is a blunt instrument.
// =============================================================================

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<String>,
}

impl IgnoreList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    // Loads the list from disk.
    //
    // A missing or unreadable file is an error: crawling without the list
    // the user asked for would hit exactly the URLs they wanted to avoid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ignore list {}", path.display()))?;

        // Blank lines would become "" which matches every URL
        let list = Self::new(
            text.lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.trim().is_empty()),
        );

        tracing::debug!("Loaded {} ignore pattern(s) from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn is_ignored(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| url.contains(pattern.as_str()))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
