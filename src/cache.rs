//! Serving cache for token artifacts
//!
//! Keyed by (list id, format). An entry is served while its creation
//! instant is not older than the artifact's last-modified time in the
//! token store; otherwise it is reloaded. Loads for the same key are
//! serialized so concurrent readers never load twice.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::ServerResult;
use crate::statuslist::TokenFormat;
use crate::traits::{CacheEvent, StatsSink, TokenRepository};

type CacheKey = (Uuid, TokenFormat);

/// An artifact as served to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub bytes: Vec<u8>,
    /// Modification time of the artifact when it was loaded
    pub created: SystemTime,
}

impl CachedToken {
    /// Creation instant in epoch milliseconds
    pub fn created_millis(&self) -> u128 {
        self.created
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    /// Quoted entity tag derived from the creation instant
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.created_millis())
    }
}

#[derive(Debug)]
struct Slot {
    token: tokio::sync::Mutex<Option<Arc<CachedToken>>>,
    last_access: parking_lot::Mutex<Instant>,
}

impl Slot {
    fn new() -> Self {
        Self {
            token: tokio::sync::Mutex::new(None),
            last_access: parking_lot::Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_access.lock().elapsed()
    }
}

/// Bounded, idle-evicting cache in front of a [`TokenRepository`]
pub struct TokenCache {
    slots: DashMap<CacheKey, Arc<Slot>>,
    tokens: Arc<dyn TokenRepository>,
    stats: Arc<dyn StatsSink>,
    max_idle: Duration,
    max_entries: usize,
}

impl TokenCache {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        stats: Arc<dyn StatsSink>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            slots: DashMap::new(),
            tokens,
            stats,
            max_idle: Duration::from_secs(config.duration_secs),
            max_entries: config.max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current artifact for a list, or None if it was never written
    pub async fn get(
        &self,
        list_id: Uuid,
        format: TokenFormat,
    ) -> ServerResult<Option<Arc<CachedToken>>> {
        let key = (list_id, format);
        let Some(last_modified) = self.tokens.last_modified(list_id, format).await? else {
            self.slots.remove(&key);
            return Ok(None);
        };

        let slot = self.slot(key);
        slot.touch();
        let mut token = slot.token.lock().await;

        if let Some(cached) = token.as_ref() {
            if cached.created >= last_modified {
                self.stats.cache_event(CacheEvent::Hit);
                return Ok(Some(Arc::clone(cached)));
            }
        }

        self.stats.cache_event(CacheEvent::Miss);
        let Some(bytes) = self.tokens.load(list_id, format).await? else {
            *token = None;
            drop(token);
            self.slots.remove(&key);
            return Ok(None);
        };
        let loaded = Arc::new(CachedToken {
            bytes,
            created: last_modified,
        });
        *token = Some(Arc::clone(&loaded));
        Ok(Some(loaded))
    }

    fn slot(&self, key: CacheKey) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(&key) {
            return Arc::clone(slot.value());
        }
        if self.slots.len() >= self.max_entries {
            self.evict_least_recent();
        }
        Arc::clone(
            self.slots
                .entry(key)
                .or_insert_with(|| Arc::new(Slot::new()))
                .value(),
        )
    }

    fn evict_least_recent(&self) {
        let oldest = self
            .slots
            .iter()
            .max_by_key(|entry| entry.value().idle_for())
            .map(|entry| *entry.key());
        if let Some(key) = oldest {
            if self.slots.remove(&key).is_some() {
                self.stats.cache_event(CacheEvent::Evicted);
            }
        }
    }

    /// Drop entries not accessed within the idle duration
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| slot.idle_for() < self.max_idle);
        let removed = before.saturating_sub(self.slots.len());
        for _ in 0..removed {
            self.stats.cache_event(CacheEvent::Evicted);
        }
        if removed > 0 {
            tracing::debug!(removed, remaining = self.slots.len(), "Cache sweep");
        }
        removed
    }
}
