// src/crawl/pipeline.rs
// =============================================================================
// What happens to a single page, start to finish.
//
//   ignored? ──yes──> done
//      │no
//   cache hit? ──no──> fetch ──error──> count it, log it, done
//      │yes              │ok
//      └────────┬────────┘ (store body in cache)
//          extract text ──> longer than 100 chars? ──> save to store
//               │
//          extract links ──> children with one less hop of depth
//
// The pipeline doesn't know about queues or workers. It takes one item and
// returns what came out of it, so the pooled and the recursive strategies
// can share it.
// =============================================================================

use std::sync::Arc;

use super::queue::CrawlItem;
use crate::cache::LruCache;
use crate::extract::{extract_content, extract_links};
use crate::fetcher::{FetchError, Fetcher};
use crate::ignore::IgnoreList;
use crate::stats::Stats;
use crate::store::Store;

// Pages with this much normalized text or less aren't worth keeping
pub const MIN_CONTENT_LEN: usize = 100;

// Raw page bodies by URL. Arc<str> so a cache hit doesn't copy the page.
pub type PageCache = LruCache<String, Arc<str>>;

#[derive(Debug)]
pub enum ItemOutcome {
    /// The URL matched the ignore list; nothing was fetched
    Ignored,
    /// The fetch failed; no content, no links
    FetchFailed(FetchError),
    /// The page was fetched (or served from the cache) and extracted
    Processed {
        cache_hit: bool,
        persisted: bool, // a new row was written
        children: Vec<CrawlItem>,
    },
}

impl ItemOutcome {
    pub fn into_children(self) -> Vec<CrawlItem> {
        match self {
            ItemOutcome::Processed { children, .. } => children,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    fetcher: Fetcher,
    cache: Arc<PageCache>,
    ignore: Arc<IgnoreList>,
    store: Store,
    stats: Arc<Stats>,
}

impl Pipeline {
    pub fn new(
        fetcher: Fetcher,
        cache: Arc<PageCache>,
        ignore: Arc<IgnoreList>,
        store: Store,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            ignore,
            store,
            stats,
        }
    }

    #[cfg(test)]
    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn process(&self, item: &CrawlItem) -> ItemOutcome {
        if self.ignore.is_ignored(&item.url) {
            tracing::debug!("Ignoring {}", item.url);
            self.stats.url_ignored();
            return ItemOutcome::Ignored;
        }

        self.stats.url_processed();

        let (body, cache_hit) = match self.cache.get(&item.url) {
            Some(body) => {
                self.stats.cache_hit();
                (body, true)
            }
            None => match self.fetcher.fetch(&item.url).await {
                Ok(body) => {
                    let body: Arc<str> = body.into();
                    self.cache.set(item.url.clone(), Arc::clone(&body));
                    (body, false)
                }
                Err(e) => {
                    self.stats.error();
                    tracing::error!("Error crawling URL {}: {}", item.url, e);
                    return ItemOutcome::FetchFailed(e);
                }
            },
        };

        let (data, links) = extract_page(&item.url, body, item.remaining_depth).await;
        let persisted = if data.len() > MIN_CONTENT_LEN {
            self.persist(&item.url, &data).await
        } else {
            tracing::debug!("Not storing {}: only {} chars of content", item.url, data.len());
            false
        };

        println!("ok: {}", item.url);

        let next_depth = item.remaining_depth.saturating_sub(1);
        let children = links
            .into_iter()
            .map(|url| CrawlItem::new(url, next_depth))
            .collect();

        ItemOutcome::Processed {
            cache_hit,
            persisted,
            children,
        }
    }

    // Store failures are logged and swallowed: one bad write shouldn't stop
    // the crawl
    async fn persist(&self, url: &str, data: &str) -> bool {
        match self.store.upsert_if_absent(url, data).await {
            Ok(inserted) => {
                if inserted {
                    self.stats.page_persisted();
                }
                inserted
            }
            Err(e) => {
                tracing::warn!("Error inserting {} into database: {}", url, e);
                false
            }
        }
    }
}

// Parsing a big page can take a while, so it runs on the blocking pool
// instead of holding up the other tasks on this worker thread.
//
// Returns (normalized text, outbound links).
async fn extract_page(url: &str, body: Arc<str>, depth_budget: u32) -> (String, Vec<String>) {
    let base_url = url.to_string();
    let parsed = tokio::task::spawn_blocking(move || {
        (
            extract_content(&body),
            extract_links(&body, &base_url, depth_budget),
        )
    })
    .await;

    parsed.unwrap_or_else(|e| {
        tracing::error!("Extraction task for {} failed: {}", url, e);
        (String::new(), Vec::new())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetcher::DEFAULT_TIMEOUT;
    use httpmock::{Method::GET, MockServer};
    use std::num::NonZeroUsize;
    use std::time::Duration;

    // Builds a pipeline over an in-memory store, shared with the worker and
    // recursive tests
    pub(crate) async fn pipeline(ignore: &[&str]) -> Pipeline {
        pipeline_with_timeout(ignore, DEFAULT_TIMEOUT).await
    }

    pub(crate) async fn pipeline_with_timeout(ignore: &[&str], timeout: Duration) -> Pipeline {
        Pipeline::new(
            Fetcher::new(timeout).unwrap(),
            Arc::new(PageCache::new(NonZeroUsize::new(16).unwrap())),
            Arc::new(IgnoreList::new(ignore.iter().copied())),
            Store::connect_in_memory().await.unwrap(),
            Arc::new(Stats::new()),
        )
    }

    pub(crate) fn long_paragraph() -> String {
        format!("<p>{}</p>", "word ".repeat(30))
    }

    #[tokio::test]
    async fn test_persists_long_page_and_returns_children() {
        let server = MockServer::start_async().await;
        let html = format!(r#"{}<a href="/about">About</a>"#, long_paragraph());
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(&html);
            })
            .await;

        let pipeline = pipeline(&[]).await;
        let seed = server.url("/");
        let outcome = pipeline.process(&CrawlItem::new(seed.clone(), 2)).await;

        match outcome {
            ItemOutcome::Processed {
                cache_hit,
                persisted,
                children,
            } => {
                assert!(!cache_hit);
                assert!(persisted);
                assert_eq!(children, vec![CrawlItem::new(server.url("/about"), 1)]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(pipeline.store().list_all_urls().await.unwrap(), vec![seed]);
        assert_eq!(pipeline.stats().snapshot().persisted, 1);
    }

    #[tokio::test]
    async fn test_short_content_is_not_persisted() {
        let server = MockServer::start_async().await;
        // Exactly 100 characters of normalized text
        let html = format!("<p>{}</p>", "a".repeat(100));
        server
            .mock_async(|when, then| {
                when.method(GET).path("/short");
                then.status(200).body(&html);
            })
            .await;

        let pipeline = pipeline(&[]).await;
        let outcome = pipeline.process(&CrawlItem::new(server.url("/short"), 1)).await;

        assert!(matches!(
            outcome,
            ItemOutcome::Processed {
                persisted: false,
                ..
            }
        ));
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ignored_url_is_never_fetched() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body(long_paragraph());
            })
            .await;

        let pipeline = pipeline(&["127.0.0.1", "localhost"]).await;
        let outcome = pipeline.process(&CrawlItem::new(server.url("/x"), 1)).await;

        assert!(matches!(outcome, ItemOutcome::Ignored));
        mock.assert_hits_async(0).await;
        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.processed_urls, 0);
        assert_eq!(stats.ignored, 1);
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_counts_one_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(500);
            })
            .await;

        let pipeline = pipeline(&[]).await;
        let outcome = pipeline.process(&CrawlItem::new(server.url("/broken"), 3)).await;

        assert!(matches!(outcome, ItemOutcome::FetchFailed(FetchError::Status(500))));
        assert_eq!(pipeline.stats().snapshot().errors, 1);
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_timeout_counts_one_error_and_stores_nothing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200)
                    .body(long_paragraph())
                    .delay(Duration::from_millis(1500));
            })
            .await;

        let pipeline = pipeline_with_timeout(&[], Duration::from_millis(300)).await;
        let outcome = pipeline.process(&CrawlItem::new(server.url("/slow"), 2)).await;

        assert!(matches!(outcome, ItemOutcome::FetchFailed(FetchError::Timeout)));
        assert_eq!(pipeline.stats().snapshot().errors, 1);
        assert_eq!(pipeline.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_visit_is_served_from_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/page");
                then.status(200).body(long_paragraph());
            })
            .await;

        let pipeline = pipeline(&[]).await;
        let item = CrawlItem::new(server.url("/page"), 1);
        pipeline.process(&item).await;
        let outcome = pipeline.process(&item).await;

        assert!(matches!(
            outcome,
            ItemOutcome::Processed {
                cache_hit: true,
                persisted: false, // already stored on the first visit
                ..
            }
        ));
        mock.assert_hits_async(1).await;
        assert_eq!(pipeline.stats().snapshot().cache_hits, 1);
        assert_eq!(pipeline.store().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_large_page_is_fully_extracted() {
        let server = MockServer::start_async().await;
        let links: String = (0..2_000)
            .map(|i| format!(r#"<p>section {} of the page</p><a href="/p/{}">next</a>"#, i, i))
            .collect();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/big");
                then.status(200).body(&links);
            })
            .await;

        let pipeline = pipeline(&[]).await;
        let outcome = pipeline.process(&CrawlItem::new(server.url("/big"), 1)).await;

        match outcome {
            ItemOutcome::Processed {
                persisted,
                children,
                ..
            } => {
                assert!(persisted);
                assert_eq!(children.len(), 2_000);
                assert_eq!(children[0], CrawlItem::new(server.url("/p/0"), 0));
                assert_eq!(children[1_999], CrawlItem::new(server.url("/p/1999"), 0));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leaf_item_yields_no_children() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/leaf");
                then.status(200).body(r#"<a href="/more">more</a>"#);
            })
            .await;

        let pipeline = pipeline(&[]).await;
        let outcome = pipeline.process(&CrawlItem::new(server.url("/leaf"), 0)).await;

        assert!(outcome.into_children().is_empty());
    }
}
