// src/main.rs
// =============================================================================
// This is the entry point of the crawler.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, filtered with RUST_LOG)
// 3. Open the database, load the ignore list, build the HTTP client
// 4. Run the crawl: one finite batch, or continuous rounds until Ctrl-C
// 5. Print a summary and exit (0 = done, 2 = couldn't start)
//
// stdout only carries "ok: URL" lines and the summary, so the output can be
// piped somewhere without the log noise.
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cache; // src/cache.rs - bounded LRU of page bodies
mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - frontier, pipeline, workers
mod extract; // src/extract/ - links and text from HTML
mod fetcher; // src/fetcher.rs - HTTP GET
mod ignore; // src/ignore.rs - URL ban list
mod stats; // src/stats.rs - counters and status reporter
mod store; // src/store.rs - SQLite persistence

use anyhow::{Context, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cache::LruCache;
use cli::Cli;
use crawl::{Crawler, Frontier, Pipeline};
use fetcher::Fetcher;
use ignore::IgnoreList;
use stats::{Stats, StatsSnapshot};
use store::Store;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging();

    let store = Store::connect(&cli.db)
        .await
        .with_context(|| format!("Failed to open database {}", cli.db.display()))?;

    // Diagnostic only; a failure here doesn't stop the crawl
    match store.deduplicate().await {
        Ok(report) if report.removed > 0 => tracing::warn!(
            "Removed {} duplicate row(s) from the database ({} -> {})",
            report.removed,
            report.before,
            report.after
        ),
        Ok(report) => tracing::info!("Database has {} stored page(s)", report.after),
        Err(e) => tracing::warn!("Could not deduplicate database: {}", e),
    }

    let ignore = IgnoreList::from_file(&cli.ignore_file)?;
    tracing::info!("Loaded {} ignore pattern(s)", ignore.len());

    let fetcher = Fetcher::new(cli.timeout()).context("Failed to build HTTP client")?;

    let stats = Arc::new(Stats::new());
    let cache = Arc::new(LruCache::new(cli.cache_size));
    let pipeline = Arc::new(Pipeline::new(
        fetcher,
        Arc::clone(&cache),
        Arc::new(ignore),
        store.clone(),
        Arc::clone(&stats),
    ));
    let frontier = Arc::new(Frontier::new(cli.frontier_config(), Arc::clone(&stats)));
    let crawler = Crawler::new(pipeline, Arc::clone(&frontier), cli.crawl_config());

    let reporter = cli
        .stats_interval()
        .map(|interval| stats::spawn_reporter(Arc::clone(&stats), Arc::clone(&frontier), interval));

    if cli.continuous {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // Without a signal handler, run until killed
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        crawler
            .run_continuous(
                cli.urls.clone(),
                cli.batch_size.get(),
                cli.pause(),
                shutdown,
            )
            .await;
    } else {
        let seeds = if cli.urls.is_empty() {
            let mut urls = store
                .list_all_urls()
                .await
                .context("Failed to load stored URLs")?;
            urls.shuffle(&mut rand::thread_rng());
            urls
        } else {
            cli.urls.clone()
        };

        if seeds.is_empty() {
            tracing::warn!("No --url given and the database is empty; nothing to crawl");
        }
        crawler.run(seeds).await;
    }

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    tracing::debug!("Page cache: {} of {} slots used", cache.len(), cache.capacity());

    let summary = Summary {
        stats: stats.snapshot(),
        stored_pages: store.count().await.unwrap_or_default(),
    };
    print_summary(&summary, cli.json)?;

    store.close().await;
    Ok(0)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Everything printed at the end of a run
#[derive(Debug, Serialize)]
struct Summary {
    #[serde(flatten)]
    stats: StatsSnapshot,
    stored_pages: u64,
}

// Prints the summary either as a table or JSON
fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(summary)?;
        println!("{}", json_output);
    } else {
        print_table(summary);
    }
    Ok(())
}

fn print_table(summary: &Summary) {
    let stats = &summary.stats;
    let rows = [
        ("Processed", stats.processed_urls),
        ("Errors", stats.errors),
        ("Ignored", stats.ignored),
        ("Cache hits", stats.cache_hits),
        ("Persisted", stats.persisted),
        ("Dropped (queue full)", stats.dropped),
        ("Pages in database", summary.stored_pages),
    ];

    println!();
    println!("{:<25} {:>10}", "SUMMARY", "COUNT");
    println!("{}", "=".repeat(36));
    for (label, value) in rows {
        println!("{:<25} {:>10}", label, value);
    }
}
