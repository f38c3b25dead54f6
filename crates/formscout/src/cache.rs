// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Result cache: remembers form verdicts per normalized URL.
//!
//! ## Eviction
//!
//! Entries older than the freshness window read as absent. When an insert
//! pushes the entry count past `max_entries`, the oldest `cleanup_size`
//! entries by *insertion* order are dropped. Reads do not refresh an entry's
//! position and overwrites keep the original slot, so this approximates LRU
//! without tracking access recency.

use crate::url_norm::url_key;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default freshness window (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

/// Default entry ceiling before eviction kicks in.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default number of entries dropped per eviction.
pub const DEFAULT_CLEANUP_SIZE: usize = 500;

/// Cached verdict for one URL.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    has_form: bool,
    /// When the verdict was recorded.
    stored_at: Instant,
}

/// In-memory verdict cache with insertion-order eviction.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<u64, CacheEntry>,
    /// Keys in insertion order.
    order: VecDeque<u64>,
    ttl: Duration,
    max_entries: usize,
    cleanup_size: usize,
}

/// Cache shared by every concurrent page check in the process.
pub type SharedCache = Arc<Mutex<ResultCache>>;

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize, cleanup_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            max_entries,
            cleanup_size,
        }
    }

    /// Wrap the cache for sharing across tasks.
    pub fn shared(self) -> SharedCache {
        Arc::new(Mutex::new(self))
    }

    /// Cached verdict for a normalized URL, or `None` when absent or stale.
    pub fn get(&self, url: &str) -> Option<bool> {
        self.get_at(url, Instant::now())
    }

    /// Record a verdict for a normalized URL.
    pub fn set(&mut self, url: &str, has_form: bool) {
        self.set_at(url, has_form, Instant::now());
    }

    pub(crate) fn get_at(&self, url: &str, now: Instant) -> Option<bool> {
        let entry = self.entries.get(&url_key(url))?;
        let age = now.saturating_duration_since(entry.stored_at);
        if age >= self.ttl {
            return None;
        }
        Some(entry.has_form)
    }

    pub(crate) fn set_at(&mut self, url: &str, has_form: bool, now: Instant) {
        let key = url_key(url);
        let entry = CacheEntry {
            has_form,
            stored_at: now,
        };
        if self.entries.insert(key, entry).is_none() {
            self.order.push_back(key);
        }

        if self.entries.len() > self.max_entries {
            self.evict_oldest();
        }
    }

    /// Drop the oldest `cleanup_size` entries by insertion order.
    fn evict_oldest(&mut self) {
        let count = self.cleanup_size.min(self.order.len());
        for key in self.order.drain(..count) {
            self.entries.remove(&key);
        }
        tracing::debug!(
            "result cache evicted {count} entries, {} remain",
            self.entries.len()
        );
    }

    /// Number of entries, including stale ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove entries past the freshness window.
    pub fn cleanup_expired(&mut self) {
        self.cleanup_expired_at(Instant::now());
    }

    pub(crate) fn cleanup_expired_at(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES, DEFAULT_CLEANUP_SIZE)
    }
}
