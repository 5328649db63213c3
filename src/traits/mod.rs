//! Trait definitions for storage, artifacts, signing and stats

pub mod lease;
pub mod signer;
pub mod stats;
pub mod storage;
pub mod token_store;

pub use lease::Lease;
pub use signer::TokenSigner;
pub use stats::{CacheEvent, StatsSink};
pub use storage::{
    list_id_from_uri, shuffled_indices, CreatedList, ListConfig, NewList, PoolSettings, Storage,
};
pub use token_store::{ListStorageMetadata, TokenRepository};
