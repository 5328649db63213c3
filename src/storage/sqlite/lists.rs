// File: src/storage/sqlite/lists.rs

use super::store::SqliteStore;
use crate::error::StorageError;
use crate::statuslist::{StatusBits, StatusList};
use crate::traits::{ListConfig, NewList, Storage};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

impl SqliteStore {
    /// Insert the list row and its free indices in one transaction
    pub(crate) async fn insert_list_impl(&self, list: &NewList) -> Result<(), StorageError> {
        let bits = StatusBits::from_u8(list.settings.bits).ok_or_else(|| {
            StorageError::Corruption(format!("pool {} has invalid bits", list.pool_id))
        })?;
        let data = StatusList::zeroed(bits, list.settings.size).into_bytes();
        let list_id = list.list_id.to_string();
        let uri = list.uri.clone();
        let pool_id = list.pool_id.clone();
        let free = list.free.clone();
        let (list_bits, size, version) = (list.settings.bits, list.settings.size, list.version as i64);
        let base_uri = self.public_url().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        self.write_tx(&list.uri, move |tx| {
            tx.execute(
                "INSERT INTO lists (id, uri, pool, base_uri, bits, size, version, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![list_id, uri, pool_id, base_uri, list_bits, size, version, data, now],
            )?;

            let mut stmt =
                tx.prepare_cached("INSERT INTO list_indices (list_id, idx) VALUES (?1, ?2)")?;
            for idx in &free {
                stmt.execute(params![list_id, idx])?;
            }
            Ok(())
        })
        .await
    }

    pub(crate) async fn list_config_impl(
        &self,
        list_uri: &str,
        allow_cache: bool,
    ) -> Result<ListConfig, StorageError> {
        if allow_cache {
            if let Some(cached) = self.list_cache().get(list_uri) {
                return Ok(cached.clone());
            }
        }

        let uri = list_uri.to_string();
        let config = self.read(move |conn| read_list_config(conn, &uri)).await?;
        self.list_cache()
            .insert(list_uri.to_string(), config.clone());
        Ok(config)
    }

    pub(crate) async fn list_data_impl(&self, list_uri: &str) -> Result<Vec<u8>, StorageError> {
        let uri = list_uri.to_string();
        self.read(move |conn| {
            conn.query_row("SELECT data FROM lists WHERE uri = ?1", params![uri], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or(StorageError::ListNotFound(uri))
        })
        .await
    }

    /// Rewrite one slot and bump the version in the same transaction
    pub(crate) async fn write_status_impl(
        &self,
        list: &ListConfig,
        list_uri: &str,
        index: u32,
        value: u8,
    ) -> Result<u64, StorageError> {
        let bits = StatusBits::from_u8(list.bits)
            .ok_or_else(|| StorageError::Corruption(format!("list {list_uri} has invalid bits")))?;
        let uri = list_uri.to_string();

        let version = self
            .write_tx(list_uri, move |tx| {
                let data: Vec<u8> = tx
                    .query_row("SELECT data FROM lists WHERE uri = ?1", params![uri], |row| {
                        row.get(0)
                    })
                    .optional()?
                    .ok_or_else(|| StorageError::ListNotFound(uri.clone()))?;

                let mut status = StatusList::from_bytes(bits, data);
                if !status.set(index, value) {
                    return Err(StorageError::Corruption(format!(
                        "list {uri} data too short for index {index}"
                    )));
                }

                let version: i64 = tx.query_row(
                    "UPDATE lists SET data = ?1, version = version + 1 WHERE uri = ?2 RETURNING version",
                    params![status.as_bytes(), uri],
                    |row| row.get(0),
                )?;
                Ok(version as u64)
            })
            .await?;

        if let Some(mut cached) = self.list_cache().get_mut(list_uri) {
            cached.version = cached.version.max(version);
        }
        Ok(version)
    }

    /// Remove up to `max_amount` free indices in allocation order
    pub(crate) async fn take_impl(
        &self,
        list_uri: &str,
        max_amount: usize,
    ) -> Result<Vec<u32>, StorageError> {
        if max_amount == 0 {
            return Ok(Vec::new());
        }
        let list_id = self.list_config_impl(list_uri, true).await?.list_id.to_string();

        self.write_tx(list_uri, move |tx| {
            let taken: Vec<u32> = {
                let mut stmt = tx.prepare_cached(
                    "SELECT idx FROM list_indices WHERE list_id = ?1 ORDER BY rowid LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![list_id, max_amount as i64], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            };

            let mut delete =
                tx.prepare_cached("DELETE FROM list_indices WHERE list_id = ?1 AND idx = ?2")?;
            for idx in &taken {
                delete.execute(params![list_id, idx])?;
            }
            Ok(taken)
        })
        .await
    }

    pub(crate) async fn free_indices_impl(
        &self,
        list_uri: &str,
        indices: &[u32],
    ) -> Result<(), StorageError> {
        if indices.is_empty() {
            return Ok(());
        }
        let list_id = self.list_config_impl(list_uri, true).await?.list_id.to_string();
        let indices = indices.to_vec();

        self.write_tx(list_uri, move |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO list_indices (list_id, idx) VALUES (?1, ?2)",
            )?;
            for idx in &indices {
                stmt.execute(params![list_id, idx])?;
            }
            Ok(())
        })
        .await
    }

    pub(crate) async fn free_count_impl(&self, list_uri: &str) -> Result<u64, StorageError> {
        let list_id = self.list_config_impl(list_uri, true).await?.list_id.to_string();
        let count: i64 = self
            .read(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM list_indices WHERE list_id = ?1",
                    params![list_id],
                    |row| row.get(0),
                )?)
            })
            .await?;
        Ok(count as u64)
    }

    /// Lists with free indices, fullest first
    pub(crate) async fn current_lists_impl(&self, pool_id: &str) -> Result<Vec<String>, StorageError> {
        let pool_id = pool_id.to_string();
        self.read(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT l.uri FROM lists l
                 JOIN list_indices i ON i.list_id = l.id
                 WHERE l.pool = ?1
                 GROUP BY l.id
                 ORDER BY COUNT(*) ASC, l.created_at ASC",
            )?;
            let uris = stmt
                .query_map(params![pool_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(uris)
        })
        .await
    }

    pub(crate) async fn all_list_uris_impl(&self, pool_id: &str) -> Result<Vec<String>, StorageError> {
        let pool_id = pool_id.to_string();
        self.read(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT uri FROM lists WHERE pool = ?1 ORDER BY created_at ASC, rowid ASC",
            )?;
            let uris = stmt
                .query_map(params![pool_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(uris)
        })
        .await
    }
}

fn read_list_config(conn: &Connection, list_uri: &str) -> Result<ListConfig, StorageError> {
    let row = conn
        .query_row(
            "SELECT id, pool, bits, size, version FROM lists WHERE uri = ?1",
            params![list_uri],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::ListNotFound(list_uri.to_string()))?;

    let (id, pool_id, bits, size, version) = row;
    let list_id = Uuid::parse_str(&id)
        .map_err(|_| StorageError::Corruption(format!("invalid list id {id}")))?;

    Ok(ListConfig {
        list_id,
        pool_id,
        bits,
        size,
        version: version as u64,
    })
}
