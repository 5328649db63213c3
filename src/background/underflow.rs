// File: src/background/underflow.rs

//! Underflow reporter
//!
//! Aggregates prefetch underflows so a saturated pool logs once per period
//! instead of once per request.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::prefetch::IndexPrefetcher;

pub struct UnderflowReporter {
    prefetcher: Arc<IndexPrefetcher>,
    period: Duration,
}

impl UnderflowReporter {
    pub fn new(prefetcher: Arc<IndexPrefetcher>, period: Duration) -> Self {
        Self { prefetcher, period }
    }

    /// Log and reset the underflow counter; returns what was reported
    pub fn report(&self) -> u64 {
        let missing = self.prefetcher.take_underflow();
        if missing > 0 {
            tracing::warn!(
                pool_id = %self.prefetcher.pool_id(),
                missing,
                buffered = self.prefetcher.buffered(),
                "Prefetch buffer underflow"
            );
        }
        missing
    }

    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report();
                }
                _ = shutdown.recv() => {
                    self.report();
                    break;
                }
            }
        }
    }
}
