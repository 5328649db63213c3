//! Token artifact repository trait

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenStoreError;
use crate::statuslist::TokenFormat;
use crate::traits::lease::Lease;

/// What the last successful writer pass published for a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStorageMetadata {
    pub list_id: Uuid,
    /// List version the artifacts reflect; 0 if never written
    pub version: u64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ListStorageMetadata {
    /// Metadata of a list that has no artifacts yet
    pub fn unwritten(list_id: Uuid) -> Self {
        Self {
            list_id,
            version: 0,
            expires_at: None,
        }
    }
}

/// Durable store for published artifacts, keyed by (list id, format)
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    /// Non-blocking pool-scoped writer lease; None if held elsewhere
    async fn obtain_pool_lock(
        &self,
        pool_id: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, TokenStoreError>;

    /// Stored metadata, or [`ListStorageMetadata::unwritten`] if absent
    async fn metadata(&self, list_id: Uuid) -> Result<ListStorageMetadata, TokenStoreError>;

    /// Replace one artifact
    async fn store(
        &self,
        list_id: Uuid,
        format: TokenFormat,
        bytes: &[u8],
    ) -> Result<(), TokenStoreError>;

    /// Replace the metadata; called only after all artifacts were stored
    async fn store_metadata(&self, metadata: &ListStorageMetadata) -> Result<(), TokenStoreError>;

    /// Artifact bytes, None if never written
    async fn load(
        &self,
        list_id: Uuid,
        format: TokenFormat,
    ) -> Result<Option<Vec<u8>>, TokenStoreError>;

    /// When the artifact was last replaced, None if never written
    async fn last_modified(
        &self,
        list_id: Uuid,
        format: TokenFormat,
    ) -> Result<Option<SystemTime>, TokenStoreError>;
}
