//! Per-pool runtime registry

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::aggregation::AggregationIds;
use crate::background::writer::{StatusListWriter, WriterSettings};
use crate::background::{BackgroundConfig, BackgroundJobRunner};
use crate::cache::{CachedToken, TokenCache};
use crate::config::{Config, PoolConfig};
use crate::error::{ServerError, ServerResult};
use crate::prefetch::{IndexPrefetcher, Reference};
use crate::signing::Ed25519TokenSigner;
use crate::statuslist::TokenFormat;
use crate::traits::{PoolSettings, StatsSink, Storage, TokenRepository, TokenSigner};

/// Everything the service keeps per configured pool
pub struct PoolRuntime {
    pub pool_id: String,
    pub config: PoolConfig,
    pub writer: Arc<StatusListWriter>,
    pub prefetcher: Arc<IndexPrefetcher>,
}

/// The engine: pools, their prefetchers and writers, and the serving cache
///
/// Built once at startup from configuration; `shutdown` stops the
/// background jobs and returns every buffered index to storage.
pub struct StatusListService {
    storage: Arc<dyn Storage>,
    stats: Arc<dyn StatsSink>,
    cache: Arc<TokenCache>,
    aggregation: AggregationIds,
    pools: BTreeMap<String, Arc<PoolRuntime>>,
    jobs: BackgroundJobRunner,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl StatusListService {
    /// Verify every pool against storage and start its prefetcher and jobs
    ///
    /// A pool stored with different bits or size is a fatal `Config` error.
    pub async fn start(
        config: &Config,
        storage: Arc<dyn Storage>,
        tokens: Arc<dyn TokenRepository>,
        stats: Arc<dyn StatsSink>,
        background: BackgroundConfig,
    ) -> ServerResult<Self> {
        config.validate()?;
        let aggregation = AggregationIds::from_config(config)?;
        let cache = Arc::new(TokenCache::new(
            Arc::clone(&tokens),
            Arc::clone(&stats),
            &config.cache,
        ));

        let mut pools = BTreeMap::new();
        for (pool_id, pool) in &config.pools {
            let expected = PoolSettings {
                bits: pool.bits,
                size: pool.size,
            };
            let stored = storage.create_or_verify_pool(pool_id, expected).await?;
            if stored != expected {
                return Err(ServerError::Config(format!(
                    "pool {pool_id} is stored with bits={} size={}, configured bits={} size={}",
                    stored.bits, stored.size, expected.bits, expected.size
                )));
            }

            let signer: Arc<dyn TokenSigner> =
                Arc::new(Ed25519TokenSigner::from_config(pool_id, &pool.signer)?);
            let writer = Arc::new(StatusListWriter::new(
                WriterSettings {
                    pool_id: pool_id.clone(),
                    issuer: pool.issuer.clone(),
                    update_interval: pool.update_interval(),
                    list_lifetime: pool.list_lifetime(),
                    aggregation_uri: aggregation.uri_for_pool(pool_id),
                },
                Arc::clone(&storage),
                Arc::clone(&tokens),
                signer,
            ));
            let prefetcher = IndexPrefetcher::start(
                pool_id,
                pool,
                Arc::clone(&storage),
                Arc::clone(&writer),
                Arc::clone(&stats),
            )
            .await?;

            pools.insert(
                pool_id.clone(),
                Arc::new(PoolRuntime {
                    pool_id: pool_id.clone(),
                    config: pool.clone(),
                    writer,
                    prefetcher: Arc::new(prefetcher),
                }),
            );
        }

        let jobs = BackgroundJobRunner::new(
            Arc::clone(&storage),
            Arc::clone(&stats),
            Arc::clone(&cache),
            background,
        );
        let handles = jobs.start(&pools);

        tracing::info!(
            pools = pools.len(),
            backend = storage.backend_name(),
            "Status list service started"
        );

        Ok(Self {
            storage,
            stats,
            cache,
            aggregation,
            pools,
            jobs,
            handles: Mutex::new(handles),
        })
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn pool_ids(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    pub fn pool(&self, pool_id: &str) -> ServerResult<&Arc<PoolRuntime>> {
        self.pools
            .get(pool_id)
            .ok_or_else(|| ServerError::PoolNotFound(pool_id.to_string()))
    }

    pub fn pool_config(&self, pool_id: &str) -> ServerResult<&PoolConfig> {
        self.pool(pool_id).map(|p| &p.config)
    }

    /// Hand out `amount` fresh references from a pool
    pub async fn reserve(&self, pool_id: &str, amount: i64) -> ServerResult<Vec<Reference>> {
        if amount < 1 {
            return Err(ServerError::InvalidAmount(amount));
        }
        let amount = usize::try_from(amount).map_err(|_| ServerError::InvalidAmount(amount))?;
        self.pool(pool_id)?.prefetcher.next_indices(amount).await
    }

    /// Pool that owns a list
    pub async fn pool_id(&self, list_uri: &str) -> ServerResult<String> {
        let list = self.storage.list_config(list_uri, true).await?;
        Ok(list.pool_id)
    }

    /// Write a status value; returns the list's new version
    pub async fn update_status(&self, list_uri: &str, index: i64, value: i64) -> ServerResult<u64> {
        let pool_id = self.pool_id(list_uri).await?;
        let version = self.storage.update_status(list_uri, index, value).await?;
        self.stats.status_updated(&pool_id, list_uri);
        tracing::debug!(pool_id = %pool_id, list_uri, index, value, version, "Status updated");
        Ok(version)
    }

    /// Every list URI of the pool behind an aggregation id
    pub async fn lists_for_aggregation(&self, aggregation_id: &str) -> ServerResult<Vec<String>> {
        let pool_id = self
            .aggregation
            .pool_for(aggregation_id)
            .ok_or_else(|| ServerError::PoolNotFound(aggregation_id.to_string()))?;
        let uris = self.storage.all_list_uris(pool_id).await?;
        if uris.is_empty() {
            return Err(ServerError::PoolNotFound(aggregation_id.to_string()));
        }
        Ok(uris)
    }

    /// Published artifact of a list in one format
    pub async fn token(&self, list_id: &str, format: TokenFormat) -> ServerResult<Arc<CachedToken>> {
        let id = Uuid::from_str(list_id).map_err(|_| ServerError::NoSuchList(list_id.to_string()))?;
        self.cache
            .get(id, format)
            .await?
            .ok_or_else(|| ServerError::NoSuchList(list_id.to_string()))
    }

    /// Run one writer pass for every pool
    pub async fn write_tokens(&self) -> ServerResult<()> {
        for pool in self.pools.values() {
            pool.writer.write_pool().await?;
        }
        Ok(())
    }

    pub fn is_healthy(&self) -> bool {
        self.storage.is_healthy()
    }

    /// Stop background jobs, then return buffered indices to storage
    pub async fn shutdown(&self) {
        self.jobs.shutdown();
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background job panicked");
            }
        }

        for (pool_id, pool) in &self.pools {
            if let Err(e) = pool.prefetcher.shutdown().await {
                tracing::error!(pool_id = %pool_id, error = %e, "Prefetcher shutdown failed");
            }
        }
        tracing::info!("Status list service stopped");
    }
}
