//! Refill worker: the only owner of the prefetch accounting

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::buffer::{PrefetchBuffer, Reference};
use crate::background::writer::StatusListWriter;
use crate::error::ServerResult;
use crate::traits::{StatsSink, Storage};

/// Wait before retrying a refill that failed
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Serializes all `needed`/`fetched` bookkeeping for one pool
///
/// Both counters only grow. `fetched - needed` is the expected buffer
/// level; a refill tops it back up to `capacity` once it drops below
/// `threshold`.
pub(crate) struct RefillWorker {
    pool_id: String,
    list_size: u32,
    threshold: i64,
    capacity: i64,
    needed: i64,
    fetched: i64,
    storage: Arc<dyn Storage>,
    writer: Arc<StatusListWriter>,
    stats: Arc<dyn StatsSink>,
    buffer: Arc<PrefetchBuffer>,
}

impl RefillWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        pool_id: String,
        list_size: u32,
        threshold: u32,
        capacity: u32,
        storage: Arc<dyn Storage>,
        writer: Arc<StatusListWriter>,
        stats: Arc<dyn StatsSink>,
        buffer: Arc<PrefetchBuffer>,
    ) -> Self {
        Self {
            pool_id,
            list_size,
            threshold: i64::from(threshold),
            capacity: i64::from(capacity),
            needed: 0,
            fetched: 0,
            storage,
            writer,
            stats,
            buffer,
        }
    }

    /// Fill the empty buffer to capacity
    pub(crate) async fn initial_fill(&mut self) -> ServerResult<()> {
        let capacity = self.capacity as usize;
        self.prefetch(capacity).await
    }

    /// Process demand signals until every sender is dropped
    pub(crate) async fn run(mut self, mut demand: mpsc::UnboundedReceiver<usize>) {
        info!(
            pool_id = %self.pool_id,
            threshold = self.threshold,
            capacity = self.capacity,
            "Prefetch worker started"
        );

        while let Some(amount) = demand.recv().await {
            self.needed += amount as i64;

            while self.fetched - self.needed < self.threshold {
                let amount = (self.capacity - self.fetched + self.needed) as usize;
                match self.prefetch(amount).await {
                    Ok(()) => self.buffer.set_last_error(None),
                    Err(e) => {
                        error!(pool_id = %self.pool_id, amount, error = %e, "Prefetch failed");
                        self.buffer.set_last_error(Some(e.to_string()));

                        // Keep listening while backing off so shutdown is not delayed
                        tokio::select! {
                            _ = tokio::time::sleep(RETRY_DELAY) => {}
                            next = demand.recv() => match next {
                                Some(amount) => self.needed += amount as i64,
                                None => {
                                    info!(pool_id = %self.pool_id, "Prefetch worker shutting down");
                                    return;
                                }
                            },
                        }
                    }
                }
            }
        }

        info!(pool_id = %self.pool_id, "Prefetch worker shutting down");
    }

    /// Move `amount` indices from storage into the buffer
    ///
    /// Takes from the first current list, or creates a list taking the
    /// remainder on creation. References reach the buffer as they arrive.
    async fn prefetch(&mut self, amount: usize) -> ServerResult<()> {
        let mut remaining = amount;

        while remaining > 0 {
            let current = self.storage.current_lists(&self.pool_id).await?;

            let (uri, taken) = match current.into_iter().next() {
                Some(uri) => {
                    let taken = self.storage.take(&uri, remaining).await?;
                    (uri, taken)
                }
                None => {
                    let created = self
                        .storage
                        .create_list(&self.pool_id, Some(remaining))
                        .await?;
                    self.stats
                        .list_created(&self.pool_id, &created.uri, self.list_size);

                    // A new list must be resolvable before its references are used
                    if let Err(e) = self.writer.write_list_token(&created.uri).await {
                        error!(
                            pool_id = %self.pool_id,
                            list_uri = %created.uri,
                            error = %e,
                            "Writing token of new list failed"
                        );
                    }
                    (created.uri, created.taken)
                }
            };

            if taken.is_empty() {
                continue;
            }
            debug!(pool_id = %self.pool_id, list_uri = %uri, amount = taken.len(), "Indices fetched");
            self.stats.indices_taken(&self.pool_id, &uri, taken.len());

            remaining = remaining.saturating_sub(taken.len());
            self.fetched += taken.len() as i64;
            self.buffer
                .push(taken.into_iter().map(|index| Reference::new(uri.as_str(), index)));
        }

        Ok(())
    }
}
