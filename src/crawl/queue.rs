// src/crawl/queue.rs
// =============================================================================
// The frontier: a bounded, shared queue of pages waiting to be crawled.
//
// How it works:
// 1. Seeds and discovered links are pushed as CrawlItems (url + depth left)
// 2. Workers pop items, waiting if the queue is empty
// 3. Every pop hands out a Ticket; dropping the Ticket marks the item done
// 4. When every pushed item is done, the batch is complete (wait_idle)
//
// Keeping the crawl balanced:
// - Every Nth pop, the pending items are shuffled. Without this, workers
//   would chase the first site's links deeper and deeper before touching
//   anything else.
//
// When the queue is full:
// - DropOldest (default): the oldest waiting item is discarded
// - DropAll: every waiting item is discarded (a hard reset)
// Either way, discarded items count as "done" so wait_idle still returns.
//
// Rust concepts:
// - VecDeque: double-ended queue, push at the back, pop at the front
// - tokio::sync::Notify: lets a task sleep until another task wakes it
// - Drop: code that runs automatically when a value goes out of scope
// =============================================================================

use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::stats::Stats;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
pub const DEFAULT_SHUFFLE_EVERY: usize = 10;

// Represents a page in the crawl queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlItem {
    pub url: String,
    pub remaining_depth: u32, // How many more link hops we may follow from here
}

impl CrawlItem {
    pub fn new(url: impl Into<String>, remaining_depth: u32) -> Self {
        Self {
            url: url.into(),
            remaining_depth,
        }
    }
}

// What to do when a push finds the queue full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Discard the single oldest waiting item
    #[default]
    DropOldest,
    /// Discard every waiting item, then accept the new one
    DropAll,
}

#[derive(Debug, Clone, Copy)]
pub struct FrontierConfig {
    pub capacity: NonZeroUsize,
    pub overflow: OverflowPolicy,
    pub shuffle_every: usize, // 0 turns shuffling off
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_QUEUE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            overflow: OverflowPolicy::default(),
            shuffle_every: DEFAULT_SHUFFLE_EVERY,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<CrawlItem>,
    popped: u64,
}

#[derive(Debug)]
pub struct Frontier {
    config: FrontierConfig,
    state: Mutex<QueueState>,
    // pushed but not yet finished (queued + being worked on)
    outstanding: AtomicUsize,
    closed: AtomicBool,
    available: Notify,
    idle: Notify,
    stats: Arc<Stats>,
}

// A dequeued item, owned by exactly one worker.
//
// Dropping it is the one and only way an item gets marked as finished,
// so every exit path of the worker (success, error, skip, even a panic)
// releases it exactly once.
#[derive(Debug)]
pub struct Ticket<'a> {
    item: CrawlItem,
    frontier: &'a Frontier,
}

impl Ticket<'_> {
    pub fn item(&self) -> &CrawlItem {
        &self.item
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.frontier.release(1);
    }
}

impl Frontier {
    pub fn new(config: FrontierConfig, stats: Arc<Stats>) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState::default()),
            outstanding: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            available: Notify::new(),
            idle: Notify::new(),
            stats,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Adds an item to the back of the queue.
    //
    // Returns how many waiting items were discarded to make room.
    // Pushing to a closed frontier does nothing.
    pub fn push(&self, item: CrawlItem) -> usize {
        if self.is_closed() {
            tracing::debug!("Frontier closed, dropping {}", item.url);
            return 0;
        }

        // Count the new item before anything can be released, so the
        // counter can't touch zero while this push is in flight
        self.outstanding.fetch_add(1, Ordering::SeqCst);

        let dropped = {
            let mut state = self.lock();
            // close() sets the flag before clearing under this lock, so a
            // racing push either lands before the clear or sees the flag here
            if self.is_closed() {
                drop(state);
                self.release(1);
                return 0;
            }

            let dropped = if state.items.len() >= self.config.capacity.get() {
                match self.config.overflow {
                    OverflowPolicy::DropOldest => state.items.pop_front().map_or(0, |_| 1),
                    OverflowPolicy::DropAll => {
                        let count = state.items.len();
                        state.items.clear();
                        count
                    }
                }
            } else {
                0
            };
            state.items.push_back(item);
            dropped
        };

        if dropped > 0 {
            tracing::warn!(
                "Frontier full ({} items), discarded {} queued item(s)",
                self.config.capacity,
                dropped
            );
            self.stats.items_dropped(dropped as u64);
            self.release(dropped);
        }

        self.available.notify_one();
        dropped
    }

    // Waits for the next item.
    //
    // Returns None once the frontier has been closed.
    pub async fn pop(&self) -> Option<Ticket<'_>> {
        loop {
            // Register interest *before* looking at the queue, otherwise a
            // push landing between the check and the await would be missed
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }

            if let Some(item) = self.try_pop_item() {
                return Some(Ticket {
                    item,
                    frontier: self,
                });
            }

            notified.await;
        }
    }

    fn try_pop_item(&self) -> Option<CrawlItem> {
        let mut state = self.lock();
        if state.items.is_empty() {
            return None;
        }

        let every = self.config.shuffle_every as u64;
        if every > 0 && state.popped % every == 0 && state.items.len() > 1 {
            state.items.make_contiguous().shuffle(&mut rand::thread_rng());
        }

        let item = state.items.pop_front();
        state.popped += 1;
        item
    }

    // Marks `count` items as finished
    fn release(&self, count: usize) {
        if count == 0 {
            return;
        }
        let before = self.outstanding.fetch_sub(count, Ordering::SeqCst);
        debug_assert!(before >= count, "frontier released more items than it holds");
        if before == count {
            self.idle.notify_waiters();
        }
    }

    // Resolves once every pushed item has been finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }

    // Stops the frontier: waiting and future pops return None, and anything
    // still queued is discarded. Items already handed out finish normally.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let abandoned = {
            let mut state = self.lock();
            let count = state.items.len();
            state.items.clear();
            count
        };
        if abandoned > 0 {
            tracing::debug!("Frontier closed with {} item(s) still queued", abandoned);
        }
        self.release(abandoned);

        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // Items waiting in the queue
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Items pushed but not yet finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a Ticket instead of a finish() method?
//    - A worker has many ways out: ignored URL, fetch error, success...
//    - Calling finish() by hand on every path is easy to get wrong: forget
//      one and wait_idle() hangs forever, call it twice and the crawl stops
//      while work is still queued
//    - With Drop, the compiler inserts the call for us, exactly once
//
// 2. Why is the queue behind a std Mutex and not a tokio Mutex?
//    - We never .await while holding the lock
//    - A std Mutex is cheaper and can't be held across an await by accident
//      (the guard isn't Send, so the compiler would complain)
//
// 3. What does notified().enable() do?
//    - It registers this task as a waiter right away, before we check the
//      queue, so a notification sent in between isn't lost
// -----------------------------------------------------------------------------
