// File: src/storage/sqlite/mod.rs

mod config;
mod leases;
mod lists;
mod pools;
mod schema;
mod store;

// Public exports
pub use config::SqliteConfig;
pub use store::SqliteStore;
