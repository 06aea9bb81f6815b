// src/crawl/recursive.rs
// Single-task, depth-first exploration: follow the first link all the way
// down before looking at its siblings. No frontier, no workers, no shuffling.
//
// It recurses through an explicit stack rather than async recursion, so a
// deep site can't blow the call stack.

use super::pipeline::Pipeline;
use super::queue::CrawlItem;

pub async fn explore(pipeline: &Pipeline, seeds: Vec<CrawlItem>) {
    // Reversed so the first seed / first link comes off the stack first
    let mut stack: Vec<CrawlItem> = seeds.into_iter().rev().collect();

    while let Some(item) = stack.pop() {
        let children = pipeline.process(&item).await.into_children();
        stack.extend(children.into_iter().rev());
    }
}
