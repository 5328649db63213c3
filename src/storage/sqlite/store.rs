// File: src/storage/sqlite/store.rs

use super::config::SqliteConfig;
use super::schema;
use crate::error::StorageError;
use crate::traits::{Lease, ListConfig, NewList, PoolSettings, Storage};
use async_trait::async_trait;
use dashmap::DashMap;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

/// SQLite implementation of the Storage trait
///
/// One connection behind a mutex; every read-modify-write runs in a
/// `BEGIN IMMEDIATE` transaction so concurrent processes sharing the file
/// serialize on the write lock.
pub struct SqliteStore {
    /// Database connection (protected by mutex for thread safety)
    conn: Arc<Mutex<Connection>>,

    config: SqliteConfig,

    /// Base of every list uri created by this store
    public_url: String,

    /// List attributes by uri (version may be stale)
    list_cache: DashMap<String, ListConfig>,
}

impl SqliteStore {
    /// Open (or create) a database file with default configuration
    pub fn new<P: AsRef<Path>>(path: P, public_url: &str) -> Result<Self, StorageError> {
        let config = SqliteConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::with_config(config, public_url)
    }

    /// Create with custom configuration
    ///
    /// Creates the schema if it doesn't exist.
    pub fn with_config(config: SqliteConfig, public_url: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(&config.path).map_err(|e| {
            StorageError::ConnectionFailed(format!("failed to open db {}: {}", config.path, e))
        })?;

        Self::configure_connection(&conn, &config)?;
        schema::create_tables(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
            public_url: public_url.trim_end_matches('/').to_string(),
            list_cache: DashMap::new(),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory(public_url: &str) -> Result<Self, StorageError> {
        let config = SqliteConfig {
            path: ":memory:".to_string(),
            wal_mode: false,
            ..Default::default()
        };
        Self::with_config(config, public_url)
    }

    /// Configure SQLite connection pragmas
    fn configure_connection(conn: &Connection, config: &SqliteConfig) -> Result<(), StorageError> {
        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms)?;
        if config.foreign_keys {
            conn.pragma_update(None, "foreign_keys", "ON")?;
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    pub(crate) fn list_cache(&self) -> &DashMap<String, ListConfig> {
        &self.list_cache
    }

    /// Shared handle for lease release callbacks
    pub(crate) fn conn_handle(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Run a read on the blocking pool
    pub(crate) async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock_conn(&conn)?;
            f(&*guard)
        })
        .await
        .map_err(join_failed)?
    }

    /// Run `f` in an IMMEDIATE transaction, retrying busy/locked failures
    ///
    /// Each attempt runs on the blocking pool; the pause between attempts
    /// does not. Exhausting `retry_attempts` yields [`StorageError::Conflict`].
    pub(crate) async fn write_tx<T, F>(&self, key: &str, f: F) -> Result<T, StorageError>
    where
        F: Fn(&Transaction<'_>) -> Result<T, StorageError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let conn = Arc::clone(&self.conn);
            let tx_fn = Arc::clone(&f);
            let result = tokio::task::spawn_blocking(move || {
                let mut guard = lock_conn(&conn)?;
                run_immediate(&mut guard, tx_fn.as_ref())
            })
            .await
            .map_err(join_failed)?;

            match result {
                Err(e) if e.is_conflict() && attempt < attempts => {
                    tracing::debug!(key, attempt, error = %e, "Write conflict, retrying");
                    tokio::time::sleep(self.config.retry_backoff()).await;
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(key, attempts, "Write conflict retries exhausted");
                    return Err(StorageError::Conflict {
                        key: key.to_string(),
                        attempts,
                    });
                }
                other => return other,
            }
        }
    }
}

pub(crate) fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::ConnectionFailed("lock poisoned".into()))
}

fn join_failed(e: tokio::task::JoinError) -> StorageError {
    StorageError::ConnectionFailed(format!("spawn_blocking failed: {e}"))
}

fn run_immediate<T, F>(conn: &mut Connection, f: &F) -> Result<T, StorageError>
where
    F: Fn(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

#[async_trait]
impl Storage for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn public_url(&self) -> &str {
        &self.public_url
    }

    fn is_healthy(&self) -> bool {
        match self.conn.try_lock() {
            Ok(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok(),
            // A statement is running on the blocking pool
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        }
    }

    async fn create_or_verify_pool(
        &self,
        pool_id: &str,
        settings: PoolSettings,
    ) -> Result<PoolSettings, StorageError> {
        self.create_or_verify_pool_impl(pool_id, settings).await
    }

    async fn pool_settings(&self, pool_id: &str) -> Result<PoolSettings, StorageError> {
        self.pool_settings_impl(pool_id).await
    }

    async fn insert_list(&self, list: &NewList) -> Result<(), StorageError> {
        self.insert_list_impl(list).await
    }

    async fn list_config(
        &self,
        list_uri: &str,
        allow_cache: bool,
    ) -> Result<ListConfig, StorageError> {
        self.list_config_impl(list_uri, allow_cache).await
    }

    async fn list_data(&self, list_uri: &str) -> Result<Vec<u8>, StorageError> {
        self.list_data_impl(list_uri).await
    }

    async fn write_status(
        &self,
        list: &ListConfig,
        list_uri: &str,
        index: u32,
        value: u8,
    ) -> Result<u64, StorageError> {
        self.write_status_impl(list, list_uri, index, value).await
    }

    async fn take(&self, list_uri: &str, max_amount: usize) -> Result<Vec<u32>, StorageError> {
        self.take_impl(list_uri, max_amount).await
    }

    async fn free_indices(&self, list_uri: &str, indices: &[u32]) -> Result<(), StorageError> {
        self.free_indices_impl(list_uri, indices).await
    }

    async fn free_count(&self, list_uri: &str) -> Result<u64, StorageError> {
        self.free_count_impl(list_uri).await
    }

    async fn current_lists(&self, pool_id: &str) -> Result<Vec<String>, StorageError> {
        self.current_lists_impl(pool_id).await
    }

    async fn all_list_uris(&self, pool_id: &str) -> Result<Vec<String>, StorageError> {
        self.all_list_uris_impl(pool_id).await
    }

    async fn reactivate_list(&self, _pool_id: &str, list_uri: &str) -> Result<bool, StorageError> {
        // Active lists are derived from list_indices, so there is nothing to restore
        self.free_count_impl(list_uri).await.map(|_| false)
    }

    async fn obtain_precreation_lock(
        &self,
        pool_id: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, StorageError> {
        self.obtain_lease_impl(&format!("precreation:{pool_id}"), ttl)
            .await
    }
}
