// File: src/background/writer/job.rs

use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};

use super::logic::StatusListWriter;

/// Token writer background job
///
/// Runs one [`StatusListWriter::write_pool`] pass per update interval.
/// A failed pass is logged; the next pass re-evaluates staleness and catches up.
pub struct WriterJob {
    writer: Arc<StatusListWriter>,
}

impl WriterJob {
    pub fn new(writer: Arc<StatusListWriter>) -> Self {
        Self { writer }
    }

    /// Run the writer as a background task
    ///
    /// Runs until shutdown signal is received via broadcast channel.
    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let mut ticker = interval(self.writer.update_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.writer.write_pool().await {
                        tracing::error!(
                            pool_id = %self.writer.pool_id(),
                            error = %e,
                            "Token writer pass failed"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(pool_id = %self.writer.pool_id(), "Token writer shutting down");
                    break;
                }
            }
        }
    }
}
