//! Key layout of the key-value backend

/// Hash `{bits, size}`
pub fn pool(pool_id: &str) -> String {
    format!("pool:{pool_id}")
}

/// Set-if-absent flag claimed by the single pool creator
pub fn pool_creation(pool_id: &str) -> String {
    format!("pool:{pool_id}:creating")
}

/// Queue of list uris believed to have free indices
pub fn current_lists(pool_id: &str) -> String {
    format!("pool:{pool_id}:current")
}

/// Set of every list uri of the pool
pub fn all_lists(pool_id: &str) -> String {
    format!("pool:{pool_id}:lists")
}

pub fn precreation_lock(pool_id: &str) -> String {
    format!("lock:precreation:{pool_id}")
}

/// Hash `{id, pool, bits, size, version}`
pub fn list(list_uri: &str) -> String {
    format!("list:{list_uri}")
}

/// Packed status bits
pub fn list_data(list_uri: &str) -> String {
    format!("list:{list_uri}:data")
}

/// Queue of free indices in allocation order
pub fn free_indices(list_uri: &str) -> String {
    format!("list:{list_uri}:free")
}
