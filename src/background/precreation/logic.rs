// File: src/background/precreation/logic.rs

use std::sync::Arc;
use std::time::Duration;

use crate::background::writer::StatusListWriter;
use crate::error::ServerResult;
use crate::traits::{StatsSink, Storage};

/// Keep `target` untouched lists ready for a pool
///
/// Runs only under the pool's precreation lease; returns the number of
/// lists created (zero when the lease is held elsewhere).
pub async fn check_precreation(
    storage: &Arc<dyn Storage>,
    writer: &StatusListWriter,
    stats: &Arc<dyn StatsSink>,
    target: u32,
    list_size: u32,
    lease_ttl: Duration,
) -> ServerResult<usize> {
    let pool_id = writer.pool_id();
    let Some(_lease) = storage.obtain_precreation_lock(pool_id, lease_ttl).await? else {
        tracing::debug!(pool_id, "Precreation lock held elsewhere, skipping");
        return Ok(0);
    };

    let mut untouched = 0usize;
    for uri in storage.current_lists(pool_id).await? {
        if storage.is_full(&uri).await? {
            untouched += 1;
        }
    }

    let missing = (target as usize).saturating_sub(untouched);
    for _ in 0..missing {
        let created = storage.create_list(pool_id, None).await?;
        stats.list_created(pool_id, &created.uri, list_size);
        if let Err(e) = writer.write_list_token(&created.uri).await {
            tracing::error!(pool_id, list_uri = %created.uri, error = %e, "Writing token of precreated list failed");
        }
    }

    if missing > 0 {
        tracing::info!(pool_id, created = missing, untouched, "Precreated lists");
    }
    Ok(missing)
}
