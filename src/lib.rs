//! status-list-server library exports (for testing and embedding)

pub mod api;
pub mod background;
pub mod cache;
pub mod config;
pub mod error;
pub mod prefetch;
pub mod service;
pub mod signing;
pub mod stats;
pub mod statuslist;
pub mod storage;
pub mod tokens;
pub mod traits;

// Re-exports
pub use config::{Config, PoolConfig};
pub use error::{ServerError, ServerResult, StorageError};
pub use prefetch::Reference;
pub use service::StatusListService;
pub use traits::{Storage, TokenRepository, TokenSigner};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
pub use storage::KvStore;
