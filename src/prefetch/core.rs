//! Per-pool index prefetcher

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::buffer::{group_by_uri, PrefetchBuffer, Reference};
use super::refill::RefillWorker;
use crate::background::writer::StatusListWriter;
use crate::config::{PoolConfig, UnderflowPolicy};
use crate::error::{ServerError, ServerResult};
use crate::traits::{StatsSink, Storage};

/// Hands out references from an in-memory buffer kept full by a worker
///
/// Every `next_indices` call reports its amount to the worker, which
/// refills from storage when the buffer level drops below the threshold.
/// Buffered references are loans: `shutdown` returns them to storage.
pub struct IndexPrefetcher {
    pool_id: String,
    policy: UnderflowPolicy,
    max_delay: Option<Duration>,
    buffer: Arc<PrefetchBuffer>,
    demand_tx: Mutex<Option<mpsc::UnboundedSender<usize>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    storage: Arc<dyn Storage>,
    stats: Arc<dyn StatsSink>,
}

impl IndexPrefetcher {
    /// Fill the buffer to capacity, then start the refill worker
    pub async fn start(
        pool_id: &str,
        pool: &PoolConfig,
        storage: Arc<dyn Storage>,
        writer: Arc<StatusListWriter>,
        stats: Arc<dyn StatsSink>,
    ) -> ServerResult<Self> {
        let buffer = Arc::new(PrefetchBuffer::new());
        let mut worker = RefillWorker::new(
            pool_id.to_string(),
            pool.size,
            pool.prefetch.threshold,
            pool.prefetch.capacity,
            Arc::clone(&storage),
            writer,
            Arc::clone(&stats),
            Arc::clone(&buffer),
        );
        worker.initial_fill().await?;

        let (demand_tx, demand_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(worker.run(demand_rx));

        tracing::info!(
            pool_id,
            buffered = buffer.len(),
            policy = ?pool.prefetch.on_underflow,
            "Index prefetcher started"
        );

        Ok(Self {
            pool_id: pool_id.to_string(),
            policy: pool.prefetch.on_underflow,
            max_delay: pool.prefetch.max_delay_ms.map(Duration::from_millis),
            buffer,
            demand_tx: Mutex::new(Some(demand_tx)),
            worker: Mutex::new(Some(handle)),
            storage,
            stats,
        })
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    /// References currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Read and reset the count of references callers asked for but did not get at once
    pub fn take_underflow(&self) -> u64 {
        self.buffer.take_underflow()
    }

    /// Hand out `amount` references
    ///
    /// Under `Fail` a short buffer is an error and nothing is handed out.
    /// Under `Delay` the call waits for the worker (bounded by `max_delay_ms`
    /// when configured).
    pub async fn next_indices(&self, amount: usize) -> ServerResult<Vec<Reference>> {
        if amount == 0 {
            return Err(ServerError::InvalidAmount(0));
        }
        self.signal_demand(amount)?;

        let mut loaned = self.buffer.take_up_to(amount);
        if loaned.len() < amount {
            self.buffer.record_underflow(amount - loaned.len());
            match self.policy {
                UnderflowPolicy::Fail => {
                    self.buffer.put_back(loaned);
                    return Err(self.underflow_error());
                }
                UnderflowPolicy::Delay => {
                    loaned = self.wait_for(loaned, amount).await?;
                }
            }
        }

        for (uri, indices) in group_by_uri(&loaned) {
            self.stats.indices_reserved(&self.pool_id, uri, indices.len());
        }
        Ok(loaned)
    }

    fn signal_demand(&self, amount: usize) -> ServerResult<()> {
        let guard = self.demand_tx.lock();
        let tx = guard
            .as_ref()
            .ok_or_else(|| ServerError::ServiceUnavailable("prefetcher is shut down".into()))?;
        tx.send(amount)
            .map_err(|_| ServerError::ServiceUnavailable("prefetch worker stopped".into()))
    }

    fn underflow_error(&self) -> ServerError {
        match self.buffer.last_error() {
            Some(e) => ServerError::ServiceUnavailable(format!(
                "pool {} cannot fetch indices: {e}",
                self.pool_id
            )),
            None => ServerError::RateLimitReached(self.pool_id.clone()),
        }
    }

    async fn wait_for(
        &self,
        mut loaned: Vec<Reference>,
        amount: usize,
    ) -> ServerResult<Vec<Reference>> {
        let deadline = self.max_delay.map(|d| Instant::now() + d);

        while loaned.len() < amount {
            // Register before re-checking so a push in between is not missed
            let notified = self.buffer.notify().notified();
            loaned.extend(self.buffer.take_up_to(amount - loaned.len()));
            if loaned.len() == amount {
                break;
            }
            if self.buffer.is_closed() {
                self.buffer.put_back(loaned);
                return Err(ServerError::ServiceUnavailable(
                    "prefetcher is shut down".into(),
                ));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        self.buffer.put_back(loaned);
                        return Err(self.underflow_error());
                    }
                }
                None => notified.await,
            }
        }
        Ok(loaned)
    }

    /// Stop the worker and return every buffered reference to storage
    ///
    /// Returns the number of references freed.
    pub async fn shutdown(&self) -> ServerResult<usize> {
        self.buffer.close();
        drop(self.demand_tx.lock().take());

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                tracing::error!(pool_id = %self.pool_id, error = %e, "Prefetch worker panicked");
            }
        }

        let buffered = self.buffer.drain();
        let mut freed = 0;
        let mut first_error = None;
        for (uri, indices) in group_by_uri(&buffered) {
            match self.storage.free_indices(uri, &indices).await {
                Ok(()) => {
                    freed += indices.len();
                    self.stats.indices_freed(&self.pool_id, uri, indices.len());
                }
                Err(e) => {
                    tracing::error!(
                        pool_id = %self.pool_id,
                        list_uri = uri,
                        amount = indices.len(),
                        error = %e,
                        "Returning buffered indices failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(pool_id = %self.pool_id, freed, "Index prefetcher stopped");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(freed),
        }
    }
}
