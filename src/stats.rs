//! Tracing-backed stats sink

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::traits::{CacheEvent, StatsSink};

/// Counter values at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub lists_created: u64,
    pub indices_taken: u64,
    pub indices_freed: u64,
    pub indices_reserved: u64,
    pub status_updates: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,
}

/// Emits every event on the `stats` target and keeps running totals
#[derive(Debug, Default)]
pub struct TracingStats {
    lists_created: AtomicU64,
    indices_taken: AtomicU64,
    indices_freed: AtomicU64,
    indices_reserved: AtomicU64,
    status_updates: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_evictions: AtomicU64,
}

impl TracingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lists_created: self.lists_created.load(Ordering::Relaxed),
            indices_taken: self.indices_taken.load(Ordering::Relaxed),
            indices_freed: self.indices_freed.load(Ordering::Relaxed),
            indices_reserved: self.indices_reserved.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
        }
    }
}

impl StatsSink for TracingStats {
    fn list_created(&self, pool_id: &str, list_uri: &str, size: u32) {
        self.lists_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "stats", pool_id, list_uri, size, "list_created");
    }

    fn indices_taken(&self, pool_id: &str, list_uri: &str, amount: usize) {
        self.indices_taken
            .fetch_add(amount as u64, Ordering::Relaxed);
        tracing::debug!(target: "stats", pool_id, list_uri, amount, "indices_taken");
    }

    fn indices_freed(&self, pool_id: &str, list_uri: &str, amount: usize) {
        self.indices_freed
            .fetch_add(amount as u64, Ordering::Relaxed);
        tracing::debug!(target: "stats", pool_id, list_uri, amount, "indices_freed");
    }

    fn indices_reserved(&self, pool_id: &str, list_uri: &str, amount: usize) {
        self.indices_reserved
            .fetch_add(amount as u64, Ordering::Relaxed);
        tracing::debug!(target: "stats", pool_id, list_uri, amount, "indices_reserved");
    }

    fn status_updated(&self, pool_id: &str, list_uri: &str) {
        self.status_updates.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "stats", pool_id, list_uri, "status_updated");
    }

    fn cache_event(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Hit => &self.cache_hits,
            CacheEvent::Miss => &self.cache_misses,
            CacheEvent::Evicted => &self.cache_evictions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "stats", event = %event, "cache");
    }
}
