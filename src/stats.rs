// src/stats.rs
// =============================================================================
// Process-wide crawl counters.
//
// Every worker bumps these as it goes; a background reporter task reads them
// every few seconds and logs a status line. Counters only ever go up.
//
// Rust concepts:
// - Atomics: lock-free counters that many threads can update at once
// - Serialize: the snapshot can be printed as JSON at the end of a crawl
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::crawl::Frontier;

#[derive(Debug, Default)]
pub struct Stats {
    processed_urls: AtomicU64,
    errors: AtomicU64,
    ignored: AtomicU64,
    persisted: AtomicU64,
    dropped: AtomicU64,
    cache_hits: AtomicU64,
}

// A plain copy of the counters at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub processed_urls: u64,
    pub errors: u64,
    pub ignored: u64,
    pub persisted: u64,
    pub dropped: u64,
    pub cache_hits: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_processed(&self) {
        self.processed_urls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn url_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed_urls: self.processed_urls.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

// Logs a status line every `interval` until the returned handle is aborted
pub fn spawn_reporter(
    stats: Arc<Stats>,
    frontier: Arc<Frontier>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so we don't log zeros
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let snapshot = stats.snapshot();
            tracing::info!(
                processed = snapshot.processed_urls,
                errors = snapshot.errors,
                persisted = snapshot.persisted,
                queued = frontier.len(),
                outstanding = frontier.outstanding(),
                "crawl status"
            );
        }
    })
}
