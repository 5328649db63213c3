// File: src/background/cache_sweep.rs

//! Periodic removal of idle serving-cache entries

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::cache::TokenCache;

pub struct CacheSweepJob {
    cache: Arc<TokenCache>,
    period: Duration,
}

impl CacheSweepJob {
    pub fn new(cache: Arc<TokenCache>, period: Duration) -> Self {
        Self { cache, period }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cache.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweep shutting down");
                    break;
                }
            }
        }
    }
}
