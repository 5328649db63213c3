//! Async storage trait definition
//!
//! Every backend keeps two entity kinds: pools (name, bits, size) and lists
//! (packed status bits, a version counter and a set of free indices).
//! Operations on one list are atomic with respect to each other; the
//! `version` counter is the only signal that a list's bits changed.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::error::StorageError;
use crate::traits::lease::Lease;

/// Stored pool shape; immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub bits: u8,
    pub size: u32,
}

/// Stored list attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    pub list_id: Uuid,
    pub pool_id: String,
    pub bits: u8,
    pub size: u32,
    pub version: u64,
}

/// A list about to be persisted
#[derive(Debug, Clone)]
pub struct NewList {
    pub list_id: Uuid,
    pub uri: String,
    pub pool_id: String,
    pub settings: PoolSettings,
    pub version: u64,
    /// Shuffled indices that stay in the free set
    pub free: Vec<u32>,
    /// Indices handed out before the list becomes visible
    pub taken: Vec<u32>,
}

/// Result of creating a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedList {
    pub uri: String,
    pub taken: Vec<u32>,
}

/// Async storage backend for pools and lists
///
/// This is the ONLY storage trait; both backends implement it.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Base URL list URIs are built from
    fn public_url(&self) -> &str;

    /// Check if the backend is reachable
    fn is_healthy(&self) -> bool;

    /// Create the pool if absent, otherwise return what is stored
    ///
    /// Concurrent callers create the pool exactly once. The caller must
    /// compare the returned settings with its own.
    async fn create_or_verify_pool(
        &self,
        pool_id: &str,
        settings: PoolSettings,
    ) -> Result<PoolSettings, StorageError>;

    /// Stored settings of a pool
    async fn pool_settings(&self, pool_id: &str) -> Result<PoolSettings, StorageError>;

    /// Persist a freshly generated list with all-zero data
    ///
    /// `list.taken` must never become visible in the free set.
    async fn insert_list(&self, list: &NewList) -> Result<(), StorageError>;

    /// Attributes of a list; `allow_cache` may serve a stale version
    async fn list_config(&self, list_uri: &str, allow_cache: bool)
        -> Result<ListConfig, StorageError>;

    /// Packed status bits of a list
    async fn list_data(&self, list_uri: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `value` at an already validated slot and bump the version by one
    ///
    /// Returns the new version.
    async fn write_status(
        &self,
        list: &ListConfig,
        list_uri: &str,
        index: u32,
        value: u8,
    ) -> Result<u64, StorageError>;

    /// Atomically remove up to `max_amount` indices from the free set
    async fn take(&self, list_uri: &str, max_amount: usize) -> Result<Vec<u32>, StorageError>;

    /// Return indices to the free set
    async fn free_indices(&self, list_uri: &str, indices: &[u32]) -> Result<(), StorageError>;

    /// Number of indices in the free set
    async fn free_count(&self, list_uri: &str) -> Result<u64, StorageError>;

    /// Lists believed to have free capacity (may undercount)
    async fn current_lists(&self, pool_id: &str) -> Result<Vec<String>, StorageError>;

    /// Every list ever created for the pool
    async fn all_list_uris(&self, pool_id: &str) -> Result<Vec<String>, StorageError>;

    /// Put a list back into the active set; false if it already was there
    async fn reactivate_list(&self, pool_id: &str, list_uri: &str) -> Result<bool, StorageError>;

    /// Non-blocking, self-expiring precreation lease for a pool
    async fn obtain_precreation_lock(
        &self,
        pool_id: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, StorageError>;

    /// Create a list with a shuffled free set, optionally taking some indices at once
    async fn create_list(
        &self,
        pool_id: &str,
        take_immediately: Option<usize>,
    ) -> Result<CreatedList, StorageError> {
        let settings = self.pool_settings(pool_id).await?;
        let list_id = Uuid::new_v4();
        let uri = format!("{}/{}", self.public_url().trim_end_matches('/'), list_id);

        let mut free = shuffled_indices(settings.size);
        let amount = take_immediately.unwrap_or(0).min(free.len());
        let taken: Vec<u32> = free.drain(..amount).collect();

        let list = NewList {
            list_id,
            uri: uri.clone(),
            pool_id: pool_id.to_string(),
            settings,
            version: 1,
            free,
            taken,
        };
        self.insert_list(&list).await?;

        if !list.taken.is_empty() {
            tracing::debug!(list_uri = %uri, amount = list.taken.len(), "Taken on creation");
        }
        tracing::info!(pool_id, list_uri = %uri, "List created");

        Ok(CreatedList {
            uri,
            taken: list.taken,
        })
    }

    /// Validate and write a status value
    ///
    /// Fails with `IndexOutOfBounds` / `ValueOutOfRange` before touching data.
    async fn update_status(
        &self,
        list_uri: &str,
        index: i64,
        value: i64,
    ) -> Result<u64, StorageError> {
        let list = self.list_config(list_uri, true).await?;
        if index < 0 || index >= i64::from(list.size) {
            return Err(StorageError::IndexOutOfBounds {
                uri: list_uri.to_string(),
                index,
                size: list.size,
            });
        }
        if value < 0 || value >= (1i64 << list.bits) {
            return Err(StorageError::ValueOutOfRange {
                uri: list_uri.to_string(),
                value,
                bits: list.bits,
            });
        }
        self.write_status(&list, list_uri, index as u32, value as u8)
            .await
    }

    /// True if no index of the list has been handed out
    async fn is_full(&self, list_uri: &str) -> Result<bool, StorageError> {
        let list = self.list_config(list_uri, true).await?;
        Ok(self.free_count(list_uri).await? == u64::from(list.size))
    }

    /// True if every index of the list has been handed out
    async fn is_empty(&self, list_uri: &str) -> Result<bool, StorageError> {
        Ok(self.free_count(list_uri).await? == 0)
    }
}

/// Uniformly shuffled permutation of `0..size`
pub fn shuffled_indices(size: u32) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..size).collect();
    indices.shuffle(&mut rand::rngs::OsRng);
    indices
}

/// Extract the list id from `{base}/{uuid}`
pub fn list_id_from_uri(list_uri: &str) -> Result<Uuid, StorageError> {
    list_uri
        .rsplit('/')
        .next()
        .and_then(|tail| Uuid::parse_str(tail).ok())
        .ok_or_else(|| StorageError::InvalidListUri(list_uri.to_string()))
}
