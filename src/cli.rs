// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every setting the crawler has comes from a flag here. There are no config
// files; main.rs turns the parsed Cli into the smaller config structs that
// the crawl module actually uses (CrawlConfig, FrontierConfig).
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct definition
// - ValueEnum: lets a flag accept one of a fixed set of words
// - NonZeroUsize: a usize that can't be 0, checked once at parse time
// =============================================================================

use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::crawl::{CrawlConfig, FrontierConfig, OverflowPolicy, Strategy, DEFAULT_SHUFFLE_EVERY};
use crate::fetcher::DEFAULT_TIMEOUT;

#[derive(Parser, Debug)]
#[command(
    name = "depthcrawl",
    version,
    about = "A depth-bounded web crawler that stores readable page text in SQLite",
    long_about = "depthcrawl fetches pages starting from seed URLs, follows their links up to a \
                  given depth, and stores the text of every page with real content in a SQLite \
                  database. Without --url it re-crawls the pages already in the database."
)]
pub struct Cli {
    /// Seed URL to start crawling from (repeatable)
    ///
    /// Example: --url https://example.com --url https://example.org
    /// With no seeds, the URLs already stored in the database are crawled
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// How many link hops to follow from each seed
    ///
    /// Depth 0 = fetch the seeds only
    /// Depth 1 = seeds + the pages they link to
    #[arg(long, default_value_t = 1)]
    pub depth: u32,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// SQLite database file (created if missing)
    #[arg(long, default_value = "spider.db")]
    pub db: PathBuf,

    /// File of URL substrings to skip, one per line
    #[arg(long, default_value = "ignore.txt")]
    pub ignore_file: PathBuf,

    /// Keep crawling random batches of stored pages until Ctrl-C
    #[arg(long)]
    pub continuous: bool,

    /// URLs per round in continuous mode
    #[arg(long, default_value = "100")]
    pub batch_size: NonZeroUsize,

    /// Seconds to wait between rounds in continuous mode
    #[arg(long, default_value_t = 10)]
    pub pause: u64,

    /// Number of page bodies kept in memory
    #[arg(long, default_value = "1000")]
    pub cache_size: NonZeroUsize,

    /// Maximum number of pages waiting in the queue
    #[arg(long, default_value = "100000")]
    pub queue_capacity: NonZeroUsize,

    /// What to discard when the queue is full
    #[arg(long, value_enum, default_value_t = OverflowPolicy::DropOldest)]
    pub overflow: OverflowPolicy,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Seconds between status lines (0 turns them off)
    #[arg(long, default_value_t = 10)]
    pub stats_interval: u64,

    /// How pages get explored
    #[arg(long, value_enum, default_value_t = Strategy::Pooled)]
    pub strategy: Strategy,

    /// Print the final summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            depth: self.depth,
            workers: self.workers,
            strategy: self.strategy,
        }
    }

    pub fn frontier_config(&self) -> FrontierConfig {
        FrontierConfig {
            capacity: self.queue_capacity,
            overflow: self.overflow,
            shuffle_every: DEFAULT_SHUFFLE_EVERY,
        }
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    // None when the reporter is turned off
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval > 0).then(|| Duration::from_secs(self.stats_interval))
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Vec<String> for --url?
//    - clap collects every occurrence of a repeated flag into the Vec
//    - An empty Vec simply means "no seeds given"
//
// 2. Why NonZeroUsize for sizes?
//    - A cache or queue of size 0 makes no sense
//    - clap parses it with FromStr, so "0" is rejected with a clear message
//      before the program even starts
//
// 3. What does `value_enum` do?
//    - It turns enum variants into accepted words: DropOldest -> drop-oldest
//    - Anything else is rejected and --help lists the valid choices
//
// 4. Why keep seconds as u64 and convert later?
//    - Flags stay simple numbers; the Duration conversion lives in one place
// -----------------------------------------------------------------------------
