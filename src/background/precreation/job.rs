// File: src/background/precreation/job.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use super::logic;
use crate::background::writer::StatusListWriter;
use crate::config::PrecreationConfig;
use crate::traits::{StatsSink, Storage};

/// Precreation background job
///
/// Periodically tops up the number of untouched lists in a pool so that
/// bursts of demand rarely create lists on the allocation path.
pub struct PrecreationJob {
    storage: Arc<dyn Storage>,
    writer: Arc<StatusListWriter>,
    stats: Arc<dyn StatsSink>,
    config: PrecreationConfig,
    list_size: u32,
}

impl PrecreationJob {
    pub fn new(
        storage: Arc<dyn Storage>,
        writer: Arc<StatusListWriter>,
        stats: Arc<dyn StatsSink>,
        config: PrecreationConfig,
        list_size: u32,
    ) -> Self {
        Self {
            storage,
            writer,
            stats,
            config,
            list_size,
        }
    }

    /// Run precreation checks until shutdown
    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let period = self.config.check_delay();
        // Lease must end before the next tick
        let lease_ttl = period.saturating_sub(Duration::from_millis(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = logic::check_precreation(
                        &self.storage,
                        &self.writer,
                        &self.stats,
                        self.config.lists,
                        self.list_size,
                        lease_ttl,
                    ).await {
                        tracing::error!(pool_id = %self.writer.pool_id(), error = %e, "Precreation check failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(pool_id = %self.writer.pool_id(), "Precreation job shutting down");
                    break;
                }
            }
        }
    }
}
