//! Storage backends
//!
//! Two implementations of [`Storage`] share one contract. The SQLite store
//! is the durable backend the server runs on and can be shared by several
//! instances through one database file. [`KvStore`] keeps its key space in
//! process memory; it suits tests and single-process embedding, so the
//! server never opens it.

use std::sync::Arc;

use crate::config::Config;
use crate::error::StorageError;

pub mod kv;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export Storage trait from traits module
pub use crate::traits::Storage;

pub use kv::{KvEngine, KvStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteStore};

/// Open the durable backend described by the configuration
#[cfg(feature = "sqlite")]
pub fn open_backend(config: &Config) -> Result<Arc<dyn Storage>, StorageError> {
    let sqlite = SqliteConfig {
        path: config.database_path.clone(),
        retry_attempts: config.retry_attempts,
        retry_backoff_ms: config.retry_backoff_ms,
        ..Default::default()
    };
    Ok(Arc::new(SqliteStore::with_config(sqlite, config.base_url())?))
}

/// Open the durable backend described by the configuration
#[cfg(not(feature = "sqlite"))]
pub fn open_backend(_config: &Config) -> Result<Arc<dyn Storage>, StorageError> {
    Err(StorageError::ConnectionFailed(
        "built without the sqlite feature".into(),
    ))
}
