// File: src/background/mod.rs

//! Background job management for pool maintenance
//!
//! Per pool:
//! - Token writer: regenerates artifacts of changed lists
//! - Precreation: keeps untouched lists ready
//! - Revival: repairs drift in the active-list tracking
//! - Underflow reporter: aggregated backpressure warnings
//!
//! Plus one global sweep of the serving cache. A failing job only logs;
//! it never stops another pool's jobs.

pub mod cache_sweep;
pub mod config;
pub mod precreation;
pub mod revival;
pub mod underflow;
pub mod writer;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::TokenCache;
use crate::service::PoolRuntime;
use crate::traits::{StatsSink, Storage};

pub use cache_sweep::CacheSweepJob;
pub use config::BackgroundConfig;
pub use precreation::PrecreationJob;
pub use revival::RevivalJob;
pub use underflow::UnderflowReporter;
pub use writer::{StatusListWriter, WriterJob};

/// Background job runner
///
/// Spawns one task per (pool, job). Jobs run until shutdown.
pub struct BackgroundJobRunner {
    storage: Arc<dyn Storage>,
    stats: Arc<dyn StatsSink>,
    cache: Arc<TokenCache>,
    config: BackgroundConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl BackgroundJobRunner {
    pub fn new(
        storage: Arc<dyn Storage>,
        stats: Arc<dyn StatsSink>,
        cache: Arc<TokenCache>,
        config: BackgroundConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            storage,
            stats,
            cache,
            config,
            shutdown_tx,
        }
    }

    /// Start all background jobs
    pub fn start(&self, pools: &BTreeMap<String, Arc<PoolRuntime>>) -> Vec<JoinHandle<()>> {
        if self.config.disabled {
            tracing::info!("Background jobs disabled");
            return vec![];
        }

        let mut handles = Vec::new();

        for (pool_id, pool) in pools {
            // 1. Token writer
            {
                let job = WriterJob::new(Arc::clone(&pool.writer));
                let shutdown_rx = self.shutdown_tx.subscribe();
                handles.push(tokio::spawn(async move {
                    job.run(shutdown_rx).await;
                }));
            }

            // 2. Precreation
            {
                let job = PrecreationJob::new(
                    Arc::clone(&self.storage),
                    Arc::clone(&pool.writer),
                    Arc::clone(&self.stats),
                    pool.config.precreation.clone(),
                    pool.config.size,
                );
                let shutdown_rx = self.shutdown_tx.subscribe();
                handles.push(tokio::spawn(async move {
                    job.run(shutdown_rx).await;
                }));
            }

            // 3. Revival
            {
                let job = RevivalJob::new(
                    pool_id.clone(),
                    Arc::clone(&self.storage),
                    self.config.revival_interval,
                );
                let shutdown_rx = self.shutdown_tx.subscribe();
                handles.push(tokio::spawn(async move {
                    job.run(shutdown_rx).await;
                }));
            }

            // 4. Underflow reporter
            {
                let job = UnderflowReporter::new(
                    Arc::clone(&pool.prefetcher),
                    self.config.underflow_report_interval,
                );
                let shutdown_rx = self.shutdown_tx.subscribe();
                handles.push(tokio::spawn(async move {
                    job.run(shutdown_rx).await;
                }));
            }

            tracing::info!(
                pool_id = %pool_id,
                update_interval_secs = pool.config.update_interval_secs,
                precreation_check_secs = pool.config.precreation.check_delay_secs,
                "Pool jobs started"
            );
        }

        // 5. Cache sweep
        {
            let job = CacheSweepJob::new(Arc::clone(&self.cache), self.config.cache_sweep_interval);
            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                job.run(shutdown_rx).await;
            }));
        }

        tracing::info!(job_count = handles.len(), "Background jobs started");
        handles
    }

    /// Signal all jobs to shutdown gracefully
    pub fn shutdown(&self) {
        tracing::info!("Signaling background jobs to shutdown");
        let _ = self.shutdown_tx.send(());
    }
}
