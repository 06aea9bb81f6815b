// src/crawl/worker.rs
// =============================================================================
// A fixed pool of workers draining the shared frontier.
//
// Each worker loops:
// 1. Pop an item (sleeping while the queue is empty)
// 2. Run it through the pipeline
// 3. Push whatever links it found back onto the frontier
// 4. Drop the ticket, which marks the item finished
//
// Step 3 must happen before step 4. Otherwise the frontier could briefly
// look idle while the children are still on their way in.
//
// Workers stop when the frontier is closed.
// =============================================================================

use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::pipeline::{ItemOutcome, Pipeline};
use super::queue::Frontier;

#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(pipeline: Arc<Pipeline>, frontier: Arc<Frontier>, workers: usize) -> Self {
        let handles = (0..workers.max(1))
            .map(|id| {
                let pipeline = Arc::clone(&pipeline);
                let frontier = Arc::clone(&frontier);
                tokio::spawn(run_worker(id, pipeline, frontier))
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    // Waits for every worker to exit. Call after Frontier::close().
    pub async fn join(self) {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }
}

async fn run_worker(id: usize, pipeline: Arc<Pipeline>, frontier: Arc<Frontier>) {
    tracing::debug!(worker = id, "worker started");

    while let Some(ticket) = frontier.pop().await {
        tracing::trace!(worker = id, "processing {}", ticket.item().url);

        let outcome = pipeline.process(ticket.item()).await;
        match &outcome {
            ItemOutcome::Ignored => {}
            ItemOutcome::FetchFailed(e) => {
                tracing::trace!(worker = id, "gave up on {}: {:?}", ticket.item().url, e)
            }
            ItemOutcome::Processed {
                cache_hit,
                persisted,
                children,
            } => tracing::trace!(
                worker = id,
                cache_hit,
                persisted,
                children = children.len(),
                "finished {}",
                ticket.item().url
            ),
        }
        for child in outcome.into_children() {
            frontier.push(child);
        }

        drop(ticket);
    }

    tracing::debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::pipeline::tests::{long_paragraph, pipeline, pipeline_with_timeout};
    use crate::crawl::queue::{CrawlItem, FrontierConfig};
    use httpmock::{Method::GET, MockServer};
    use std::time::Duration;

    // Runs one finite batch the way main does
    async fn crawl(pipeline: Arc<Pipeline>, seeds: Vec<CrawlItem>, workers: usize) {
        let frontier = Arc::new(Frontier::new(
            FrontierConfig::default(),
            Arc::clone(pipeline.stats()),
        ));
        let pool = WorkerPool::spawn(pipeline, Arc::clone(&frontier), workers);
        assert_eq!(pool.len(), workers);

        for seed in seeds {
            frontier.push(seed);
        }

        tokio::time::timeout(Duration::from_secs(10), frontier.wait_idle())
            .await
            .expect("crawl should drain");
        frontier.close();
        tokio::time::timeout(Duration::from_secs(5), pool.join())
            .await
            .expect("workers should exit after close");
        assert_eq!(frontier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_crawls_small_site_to_completion() {
        let server = MockServer::start_async().await;

        // /        -> /a, /b
        // /a       -> /a/deep
        // /b       (short page, not stored)
        // /a/deep  -> /never (out of depth)
        let root = format!(
            r#"{}<a href="/a">a</a><a href="/b">b</a>"#,
            long_paragraph()
        );
        let a = format!(r#"{}<a href="/a/deep">deep</a>"#, long_paragraph());
        let deep = format!(r#"{}<a href="/never">never</a>"#, long_paragraph());

        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(&root);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/a");
                then.status(200).body(&a);
            })
            .await;
        let short = server
            .mock_async(|when, then| {
                when.method(GET).path("/b");
                then.status(200).body("<p>tiny</p>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/a/deep");
                then.status(200).body(&deep);
            })
            .await;
        let never = server
            .mock_async(|when, then| {
                when.method(GET).path("/never");
                then.status(200).body(long_paragraph());
            })
            .await;

        let pipeline = Arc::new(pipeline(&[]).await);
        crawl(
            Arc::clone(&pipeline),
            vec![CrawlItem::new(server.url("/"), 2)],
            3,
        )
        .await;

        let mut stored = pipeline.store().list_all_urls().await.unwrap();
        stored.sort();
        let mut expected = vec![server.url("/"), server.url("/a"), server.url("/a/deep")];
        expected.sort();
        assert_eq!(stored, expected);

        short.assert_hits_async(1).await;
        never.assert_hits_async(0).await;

        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.processed_urls, 4);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_crawl() {
        let server = MockServer::start_async().await;
        let root = format!(
            r#"{}<a href="/slow">slow</a><a href="/gone">gone</a><a href="/ads.banner">ad</a><a href="/fine">fine</a>"#,
            long_paragraph()
        );
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(&root);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200)
                    .body(long_paragraph())
                    .delay(Duration::from_millis(1500));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(404);
            })
            .await;
        let ad = server
            .mock_async(|when, then| {
                when.method(GET).path("/ads.banner");
                then.status(200).body(long_paragraph());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/fine");
                then.status(200).body(long_paragraph());
            })
            .await;

        let pipeline =
            Arc::new(pipeline_with_timeout(&["/ads."], Duration::from_millis(300)).await);
        crawl(
            Arc::clone(&pipeline),
            vec![CrawlItem::new(server.url("/"), 1)],
            2,
        )
        .await;

        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.errors, 2, "/slow times out and /gone is a 404");
        assert_eq!(stats.ignored, 1, "/ads.banner is on the ignore list");
        ad.assert_hits_async(0).await;

        let mut stored = pipeline.store().list_all_urls().await.unwrap();
        stored.sort();
        let mut expected = vec![server.url("/"), server.url("/fine")];
        expected.sort();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let pipeline = Arc::new(pipeline(&[]).await);
        crawl(Arc::clone(&pipeline), Vec::new(), 4).await;
        assert_eq!(pipeline.stats().snapshot().processed_urls, 0);
    }
}
