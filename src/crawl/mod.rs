// src/crawl/mod.rs
// =============================================================================
// This module runs the crawl.
//
// Submodules:
// - queue: the frontier (bounded work queue + completion tracking)
// - pipeline: what happens to one page
// - worker: a pool of tasks draining the frontier
// - recursive: single-task depth-first alternative
//
// Two ways to drive it:
// - run(): one finite batch; returns when every discovered page is done
// - run_continuous(): keeps revisiting pages from the store until shut down
// =============================================================================

mod pipeline;
mod queue;
mod recursive;
mod worker;

pub use pipeline::Pipeline;
pub use queue::{Frontier, FrontierConfig, OverflowPolicy, DEFAULT_SHUFFLE_EVERY};

use queue::CrawlItem;
use worker::WorkerPool;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// How pages get explored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// A pool of workers sharing a shuffled frontier
    #[default]
    Pooled,
    /// One task, depth-first, following each link as soon as it's found
    Recursive,
}

#[derive(Debug, Clone, Copy)]
pub struct CrawlConfig {
    pub depth: u32,
    pub workers: usize,
    pub strategy: Strategy,
}

pub struct Crawler {
    pipeline: Arc<Pipeline>,
    frontier: Arc<Frontier>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(pipeline: Arc<Pipeline>, frontier: Arc<Frontier>, config: CrawlConfig) -> Self {
        Self {
            pipeline,
            frontier,
            config,
        }
    }

    fn seed_items(&self, urls: Vec<String>) -> Vec<CrawlItem> {
        urls.into_iter()
            .map(|url| CrawlItem::new(url, self.config.depth))
            .collect()
    }

    // Crawls a finite batch of seeds and everything reachable from them
    pub async fn run(&self, seeds: Vec<String>) {
        let seeds = self.seed_items(seeds);
        tracing::info!(
            "Crawling {} seed(s) at depth {} ({:?})",
            seeds.len(),
            self.config.depth,
            self.config.strategy
        );

        match self.config.strategy {
            Strategy::Pooled => {
                let pool = WorkerPool::spawn(
                    Arc::clone(&self.pipeline),
                    Arc::clone(&self.frontier),
                    self.config.workers,
                );
                tracing::debug!("Started {} worker(s)", pool.len());
                self.run_pooled_round(seeds).await;
                self.frontier.close();
                pool.join().await;
            }
            Strategy::Recursive => recursive::explore(&self.pipeline, seeds).await,
        }
    }

    // Pushes a batch and waits until it (and everything it discovers) is done.
    // The pool must already be running.
    async fn run_pooled_round(&self, items: Vec<CrawlItem>) {
        for item in items {
            self.frontier.push(item);
        }
        self.frontier.wait_idle().await;
    }

    // Re-crawls random batches of stored pages forever, pausing between
    // rounds, until `shutdown` resolves.
    //
    // If seeds are given they make up the first round.
    pub async fn run_continuous<F>(
        &self,
        seeds: Vec<String>,
        batch_size: usize,
        pause: Duration,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        let pool = (self.config.strategy == Strategy::Pooled).then(|| {
            WorkerPool::spawn(
                Arc::clone(&self.pipeline),
                Arc::clone(&self.frontier),
                self.config.workers,
            )
        });

        let rounds = async {
            let mut batch = seeds;
            let mut round = 0u64;
            loop {
                if batch.is_empty() {
                    batch = match self.pipeline.store().sample_random_urls(batch_size).await {
                        Ok(urls) => urls,
                        Err(e) => {
                            tracing::error!("Failed to sample URLs from the store: {}", e);
                            Vec::new()
                        }
                    };
                }

                if batch.is_empty() {
                    tracing::info!("Nothing to crawl yet, waiting {:?}", pause);
                } else {
                    round += 1;
                    tracing::info!("Round {}: {} URL(s)", round, batch.len());
                    let items = self.seed_items(std::mem::take(&mut batch));
                    match self.config.strategy {
                        Strategy::Pooled => self.run_pooled_round(items).await,
                        Strategy::Recursive => recursive::explore(&self.pipeline, items).await,
                    }
                }

                tokio::time::sleep(pause).await;
            }
        };

        tokio::select! {
            _ = rounds => {}
            _ = shutdown => tracing::info!("Shutting down, letting in-flight pages finish"),
        }

        self.frontier.close();
        if let Some(pool) = pool {
            pool.join().await;
        }
    }
}
