//! Storage trait over the key-value engine

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::engine::KvEngine;
use super::keys;
use crate::error::StorageError;
use crate::statuslist::{StatusBits, StatusList};
use crate::traits::{Lease, ListConfig, NewList, PoolSettings, Storage};

/// First pause of a waiting (non-creating) pool initializer
const POOL_WAIT_INITIAL: Duration = Duration::from_millis(20);
/// Waiting stops once the next pause would exceed this
const POOL_WAIT_LIMIT: Duration = Duration::from_millis(500);

/// Atomic key-value backend over an in-process engine
///
/// Each operation maps onto single-key atomic commands; a status write is
/// a bitfield set followed by a version increment. Not durable.
pub struct KvStore {
    kv: Arc<KvEngine>,
    public_url: String,
    list_cache: DashMap<String, ListConfig>,
}

impl KvStore {
    pub fn new(public_url: &str) -> Self {
        Self::with_engine(Arc::new(KvEngine::new()), public_url)
    }

    /// Store over a key space shared with other stores in this process
    pub fn with_engine(kv: Arc<KvEngine>, public_url: &str) -> Self {
        Self {
            kv,
            public_url: public_url.trim_end_matches('/').to_string(),
            list_cache: DashMap::new(),
        }
    }

    fn read_pool(&self, pool_id: &str) -> Result<Option<PoolSettings>, StorageError> {
        let Some(hash) = self.kv.hgetall(&keys::pool(pool_id))? else {
            return Ok(None);
        };
        Ok(Some(PoolSettings {
            bits: field(&hash, "bits", pool_id)?,
            size: field(&hash, "size", pool_id)?,
        }))
    }

    fn read_list(&self, list_uri: &str) -> Result<ListConfig, StorageError> {
        let hash = self
            .kv
            .hgetall(&keys::list(list_uri))?
            .ok_or_else(|| StorageError::ListNotFound(list_uri.to_string()))?;

        let id: String = field(&hash, "id", list_uri)?;
        Ok(ListConfig {
            list_id: Uuid::parse_str(&id)
                .map_err(|_| StorageError::Corruption(format!("invalid list id {id}")))?,
            pool_id: field(&hash, "pool", list_uri)?,
            bits: field(&hash, "bits", list_uri)?,
            size: field(&hash, "size", list_uri)?,
            version: field(&hash, "version", list_uri)?,
        })
    }
}

fn field<T: std::str::FromStr>(
    hash: &HashMap<String, String>,
    name: &str,
    key: &str,
) -> Result<T, StorageError> {
    hash.get(name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| StorageError::Corruption(format!("{key}: missing or invalid field {name}")))
}

#[async_trait]
impl Storage for KvStore {
    fn backend_name(&self) -> &'static str {
        "memory-kv"
    }

    fn public_url(&self) -> &str {
        &self.public_url
    }

    fn is_healthy(&self) -> bool {
        true
    }

    async fn create_or_verify_pool(
        &self,
        pool_id: &str,
        settings: PoolSettings,
    ) -> Result<PoolSettings, StorageError> {
        if let Some(stored) = self.read_pool(pool_id)? {
            return Ok(stored);
        }

        if self.kv.set_nx_px(&keys::pool_creation(pool_id), "1", None) {
            self.kv.hset(
                &keys::pool(pool_id),
                &[
                    ("bits", settings.bits.to_string()),
                    ("size", settings.size.to_string()),
                ],
            )?;
            tracing::info!(pool_id, bits = settings.bits, size = settings.size, "Pool created");
            return Ok(settings);
        }

        // Another initializer holds the flag; wait for its hash to appear
        let mut wait = POOL_WAIT_INITIAL;
        while wait <= POOL_WAIT_LIMIT {
            tokio::time::sleep(wait).await;
            if let Some(stored) = self.read_pool(pool_id)? {
                return Ok(stored);
            }
            wait += wait / 3;
        }
        Err(StorageError::ConnectionFailed(format!(
            "pool {pool_id} creation did not complete"
        )))
    }

    async fn pool_settings(&self, pool_id: &str) -> Result<PoolSettings, StorageError> {
        self.read_pool(pool_id)?
            .ok_or_else(|| StorageError::PoolNotFound(pool_id.to_string()))
    }

    async fn insert_list(&self, list: &NewList) -> Result<(), StorageError> {
        let bits = StatusBits::from_u8(list.settings.bits).ok_or_else(|| {
            StorageError::Corruption(format!("pool {} has invalid bits", list.pool_id))
        })?;

        self.kv.set(
            &keys::list_data(&list.uri),
            StatusList::zeroed(bits, list.settings.size).into_bytes(),
        );
        let free: Vec<String> = list.free.iter().map(u32::to_string).collect();
        if !free.is_empty() {
            self.kv.rpush(&keys::free_indices(&list.uri), &free)?;
        }
        self.kv.hset(
            &keys::list(&list.uri),
            &[
                ("id", list.list_id.to_string()),
                ("pool", list.pool_id.clone()),
                ("bits", list.settings.bits.to_string()),
                ("size", list.settings.size.to_string()),
                ("version", list.version.to_string()),
            ],
        )?;
        self.kv.sadd(&keys::all_lists(&list.pool_id), &list.uri)?;
        if !free.is_empty() {
            self.kv
                .rpush_unique(&keys::current_lists(&list.pool_id), &list.uri)?;
        }
        Ok(())
    }

    async fn list_config(
        &self,
        list_uri: &str,
        allow_cache: bool,
    ) -> Result<ListConfig, StorageError> {
        if allow_cache {
            if let Some(cached) = self.list_cache.get(list_uri) {
                return Ok(cached.clone());
            }
        }
        let config = self.read_list(list_uri)?;
        self.list_cache
            .insert(list_uri.to_string(), config.clone());
        Ok(config)
    }

    async fn list_data(&self, list_uri: &str) -> Result<Vec<u8>, StorageError> {
        self.kv
            .get(&keys::list_data(list_uri))?
            .ok_or_else(|| StorageError::ListNotFound(list_uri.to_string()))
    }

    async fn write_status(
        &self,
        list: &ListConfig,
        list_uri: &str,
        index: u32,
        value: u8,
    ) -> Result<u64, StorageError> {
        let bits = StatusBits::from_u8(list.bits)
            .ok_or_else(|| StorageError::Corruption(format!("list {list_uri} has invalid bits")))?;

        self.kv
            .bitfield_set(&keys::list_data(list_uri), bits, index, value)?;
        let version = self.kv.hincrby(&keys::list(list_uri), "version", 1)? as u64;

        if let Some(mut cached) = self.list_cache.get_mut(list_uri) {
            cached.version = cached.version.max(version);
        }
        Ok(version)
    }

    async fn take(&self, list_uri: &str, max_amount: usize) -> Result<Vec<u32>, StorageError> {
        if max_amount == 0 {
            return Ok(Vec::new());
        }
        let list = self.list_config(list_uri, true).await?;

        let popped = self.kv.lpop(&keys::free_indices(list_uri), max_amount)?;
        if popped.len() < max_amount {
            self.kv
                .lrem(&keys::current_lists(&list.pool_id), list_uri)?;
            tracing::debug!(list_uri, "List exhausted, removed from current lists");
        }

        popped
            .iter()
            .map(|v| {
                v.parse().map_err(|_| {
                    StorageError::Corruption(format!("{list_uri}: invalid free index {v}"))
                })
            })
            .collect()
    }

    async fn free_indices(&self, list_uri: &str, indices: &[u32]) -> Result<(), StorageError> {
        if indices.is_empty() {
            return Ok(());
        }
        let list = self.list_config(list_uri, true).await?;
        let values: Vec<String> = indices.iter().map(u32::to_string).collect();
        self.kv.rpush(&keys::free_indices(list_uri), &values)?;
        self.kv
            .rpush_unique(&keys::current_lists(&list.pool_id), list_uri)?;
        Ok(())
    }

    async fn free_count(&self, list_uri: &str) -> Result<u64, StorageError> {
        // Fails with ListNotFound for unknown lists
        self.list_config(list_uri, true).await?;
        Ok(self.kv.llen(&keys::free_indices(list_uri))? as u64)
    }

    async fn current_lists(&self, pool_id: &str) -> Result<Vec<String>, StorageError> {
        self.kv.lrange_all(&keys::current_lists(pool_id))
    }

    async fn all_list_uris(&self, pool_id: &str) -> Result<Vec<String>, StorageError> {
        let mut uris = self.kv.smembers(&keys::all_lists(pool_id))?;
        uris.sort();
        Ok(uris)
    }

    async fn reactivate_list(&self, pool_id: &str, list_uri: &str) -> Result<bool, StorageError> {
        self.kv
            .rpush_unique(&keys::current_lists(pool_id), list_uri)
    }

    async fn obtain_precreation_lock(
        &self,
        pool_id: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, StorageError> {
        let key = keys::precreation_lock(pool_id);
        let holder = Uuid::new_v4().to_string();
        if !self.kv.set_nx_px(&key, &holder, Some(ttl)) {
            return Ok(None);
        }

        let kv = Arc::clone(&self.kv);
        let lease_key = key.clone();
        Ok(Some(Lease::new(key, move || {
            kv.del_if_eq(&lease_key, &holder);
        })))
    }
}
