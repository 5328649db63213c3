// File: src/storage/sqlite/config.rs

use std::time::Duration;

/// SQLite storage backend configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to database file (or ":memory:" for in-memory)
    pub path: String,

    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,

    /// Enable foreign key enforcement
    pub foreign_keys: bool,

    /// Attempts for a transaction that keeps hitting SQLITE_BUSY / SQLITE_LOCKED
    pub retry_attempts: u32,

    /// Fixed pause between attempts
    pub retry_backoff_ms: u64,
}

impl SqliteConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "status-list.db".to_string(),
            wal_mode: true, // Enable WAL for concurrent reads
            busy_timeout_ms: 5000,
            foreign_keys: true,
            retry_attempts: 10,
            retry_backoff_ms: 500,
        }
    }
}
