//! Atomic key-value storage backend
//!
//! The key space lives in process memory and ends with the process, so
//! versions, loans and pools do not survive a restart and leases are not
//! seen by other processes. Several stores in one process may share an
//! engine through [`KvStore::with_engine`].

mod engine;
pub(crate) mod keys;
mod store;

pub use engine::KvEngine;
pub use store::KvStore;
