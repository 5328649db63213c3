// File: src/storage/sqlite/schema.rs

use crate::error::StorageError;
use rusqlite::Connection;

/// Create all tables (idempotent)
pub fn create_tables(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Pools: bits/size are fixed at creation
CREATE TABLE IF NOT EXISTS pools (
    name TEXT PRIMARY KEY,
    bits INTEGER NOT NULL,
    size INTEGER NOT NULL,
    created_at INTEGER NOT NULL             -- Unix millis
);

-- Lists: packed status bits plus a version bumped on every write
CREATE TABLE IF NOT EXISTS lists (
    id TEXT PRIMARY KEY,                    -- UUID as text
    uri TEXT NOT NULL UNIQUE,
    pool TEXT NOT NULL,
    base_uri TEXT NOT NULL,
    bits INTEGER NOT NULL,
    size INTEGER NOT NULL,
    version INTEGER NOT NULL,
    data BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (pool) REFERENCES pools(name)
);

-- Free indices; rowid order is the shuffled allocation order
CREATE TABLE IF NOT EXISTS list_indices (
    list_id TEXT NOT NULL,
    idx INTEGER NOT NULL,
    PRIMARY KEY (list_id, idx),
    FOREIGN KEY (list_id) REFERENCES lists(id)
);

-- Advisory leases (precreation)
CREATE TABLE IF NOT EXISTS leases (
    name TEXT PRIMARY KEY,
    holder TEXT NOT NULL,
    expires_at INTEGER NOT NULL             -- Unix millis
);

CREATE INDEX IF NOT EXISTS idx_lists_pool ON lists(pool);
CREATE INDEX IF NOT EXISTS idx_list_indices_list ON list_indices(list_id);
"#;
