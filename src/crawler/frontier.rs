//! Depth-bounded crawl frontier
//!
//! This module handles:
//! - FIFO ordering of pending crawl units (breadth first)
//! - Refusing units deeper than the configured maximum
//! - Refusing URLs that were already queued during this run

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUnit {
    /// Canonical URL to fetch
    pub url: Url,

    /// Link distance from the seed (seed is 0)
    pub depth: u32,

    /// Page the URL was discovered on; None for the seed
    pub parent_url: Option<Url>,

    /// Off-site media source: retained only if it classifies as media
    pub media_only: bool,
}

impl CrawlUnit {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            parent_url: None,
            media_only: false,
        }
    }
}

/// Pending work queue
///
/// Every URL is accepted at most once per run: the first discovery decides
/// its depth, later discoveries at any depth are dropped.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlUnit>,
    seen: HashSet<String>,
    max_depth: u32,
    enqueued: u64,
}

impl Frontier {
    pub fn new(max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            max_depth,
            enqueued: 0,
        }
    }

    /// Queues a unit
    ///
    /// # Returns
    ///
    /// `false` if the unit is deeper than the maximum depth or its URL was
    /// already queued
    pub fn push(&mut self, unit: CrawlUnit) -> bool {
        if unit.depth > self.max_depth {
            return false;
        }
        if !self.seen.insert(unit.url.as_str().to_string()) {
            return false;
        }

        self.queue.push_back(unit);
        self.enqueued += 1;
        true
    }

    pub fn pop(&mut self) -> Option<CrawlUnit> {
        self.queue.pop_front()
    }

    /// Units currently waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Units accepted since the frontier was created
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }
}
