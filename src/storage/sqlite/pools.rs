// File: src/storage/sqlite/pools.rs

use super::store::SqliteStore;
use crate::error::StorageError;
use crate::traits::PoolSettings;
use rusqlite::{params, Connection, OptionalExtension};

impl SqliteStore {
    /// Insert the pool if absent and return what is stored
    pub(crate) async fn create_or_verify_pool_impl(
        &self,
        pool_id: &str,
        settings: PoolSettings,
    ) -> Result<PoolSettings, StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        let name = pool_id.to_string();
        let stored = self
            .write_tx(pool_id, move |tx| {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO pools (name, bits, size, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![name, settings.bits, settings.size, now],
                )?;
                if inserted == 1 {
                    tracing::info!(pool_id = %name, bits = settings.bits, size = settings.size, "Pool created");
                }
                read_pool(tx, &name)?.ok_or_else(|| StorageError::PoolNotFound(name.clone()))
            })
            .await?;
        Ok(stored)
    }

    pub(crate) async fn pool_settings_impl(
        &self,
        pool_id: &str,
    ) -> Result<PoolSettings, StorageError> {
        let name = pool_id.to_string();
        self.read(move |conn| read_pool(conn, &name)?.ok_or(StorageError::PoolNotFound(name)))
            .await
    }
}

fn read_pool(conn: &Connection, pool_id: &str) -> Result<Option<PoolSettings>, StorageError> {
    let pool = conn
        .query_row(
            "SELECT bits, size FROM pools WHERE name = ?1",
            params![pool_id],
            |row| {
                Ok(PoolSettings {
                    bits: row.get(0)?,
                    size: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(pool)
}
