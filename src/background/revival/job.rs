// File: src/background/revival/job.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use super::logic;
use crate::traits::Storage;

/// Revival background job
///
/// Low-frequency repair of the active-list tracking for one pool.
pub struct RevivalJob {
    pool_id: String,
    storage: Arc<dyn Storage>,
    period: Duration,
}

impl RevivalJob {
    pub fn new(pool_id: impl Into<String>, storage: Arc<dyn Storage>, period: Duration) -> Self {
        Self {
            pool_id: pool_id.into(),
            storage,
            period,
        }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires at once; nothing can have drifted yet
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match logic::revive_lists(&self.storage, &self.pool_id).await {
                        Ok(0) => {}
                        Ok(revived) => tracing::info!(pool_id = %self.pool_id, revived, "Revival pass finished"),
                        Err(e) => tracing::error!(pool_id = %self.pool_id, error = %e, "Revival pass failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(pool_id = %self.pool_id, "Revival job shutting down");
                    break;
                }
            }
        }
    }
}
