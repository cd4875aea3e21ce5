//! Crawl frontier: the BFS queue of discovered URLs
//!
//! This module handles:
//! - Depth-ordered priority queue (FIFO among equal depths)
//! - Dedup through SHA-256 hashes of normalized URLs
//! - Allowed-domain filtering
//! - Lazy deletion of entries visited after they were queued

use crate::config::Config;
use crate::url::{is_allowed_host, netloc, normalize_url, url_hash};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use url::Url;

/// A normalized URL waiting to be fetched
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// Normalized absolute URL
    pub url: String,

    /// BFS depth (the seed is 0)
    pub depth: u32,

    /// Insertion sequence, breaks ties between equal depths
    seq: u64,
}

// BinaryHeap is a max-heap; reverse so the lowest depth, then the oldest
// insertion, pops first
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.seq == other.seq
    }
}

impl Eq for FrontierEntry {}

/// Job-scoped crawl frontier
///
/// A URL hash in `visited` is terminal: the URL is never queued or returned
/// again. `enqueued` keeps a URL from being queued twice.
pub struct Frontier {
    queue: BinaryHeap<FrontierEntry>,
    enqueued: HashSet<String>,
    visited: HashSet<String>,
    allowed_domains: HashSet<String>,
    max_depth: u32,
    next_seq: u64,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Entries deeper than this are rejected
    /// * `allowed_domains` - Network locations the crawl may enter
    pub fn new<I, S>(max_depth: u32, allowed_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: BinaryHeap::new(),
            enqueued: HashSet::new(),
            visited: HashSet::new(),
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.into().to_lowercase())
                .collect(),
            max_depth,
            next_seq: 0,
        }
    }

    /// Creates a frontier with the job's depth limit and allow-list
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.crawl.max_depth, config.allowed_domains())
    }

    /// Queues a URL at the given depth
    ///
    /// Returns `false` if the URL is invalid, too deep, already seen, or
    /// outside the allowed domains.
    pub fn add(&mut self, url: &str, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let Ok(normalized) = normalize_url(url) else {
            tracing::trace!(url = %url, "Rejected invalid URL");
            return false;
        };

        let hash = url_hash(&normalized);
        if self.visited.contains(&hash) || self.enqueued.contains(&hash) {
            return false;
        }

        let allowed = Url::parse(&normalized)
            .ok()
            .and_then(|u| netloc(&u))
            .is_some_and(|host| is_allowed_host(&host, &self.allowed_domains));
        if !allowed {
            tracing::trace!(url = %normalized, "Rejected URL outside allowed domains");
            return false;
        }

        self.queue.push(FrontierEntry {
            url: normalized,
            depth,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.enqueued.insert(hash);
        true
    }

    /// Pops the shallowest URL that has not been visited
    ///
    /// Entries visited after being queued are discarded here rather than
    /// removed from the heap eagerly.
    pub fn next(&mut self) -> Option<(String, u32)> {
        while let Some(entry) = self.queue.pop() {
            if self.visited.contains(&url_hash(&entry.url)) {
                continue;
            }
            return Some((entry.url, entry.depth));
        }
        None
    }

    /// Marks a URL as visited; it will never be returned again
    pub fn mark_visited(&mut self, url: &str) {
        let key = normalize_url(url).unwrap_or_else(|_| url.to_string());
        self.visited.insert(url_hash(&key));
    }

    /// Whether a URL has been marked visited
    pub fn is_visited(&self, url: &str) -> bool {
        let key = normalize_url(url).unwrap_or_else(|_| url.to_string());
        self.visited.contains(&url_hash(&key))
    }

    /// Number of URLs marked visited
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of entries in the queue, stale ones included
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
