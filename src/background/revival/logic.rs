// File: src/background/revival/logic.rs

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ServerResult;
use crate::traits::Storage;

/// Put lists that still have free indices back into the active set
///
/// Returns the number of lists revived.
pub async fn revive_lists(storage: &Arc<dyn Storage>, pool_id: &str) -> ServerResult<usize> {
    let current: HashSet<String> = storage.current_lists(pool_id).await?.into_iter().collect();

    let mut revived = 0;
    for uri in storage.all_list_uris(pool_id).await? {
        if current.contains(&uri) || storage.is_empty(&uri).await? {
            continue;
        }
        if storage.reactivate_list(pool_id, &uri).await? {
            tracing::info!(pool_id, list_uri = %uri, "Revived list with free indices");
            revived += 1;
        }
    }
    Ok(revived)
}
