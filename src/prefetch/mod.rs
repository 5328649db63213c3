//! Index prefetching
//!
//! One [`IndexPrefetcher`] per pool keeps a buffer of references already
//! taken from storage so that allocation does not wait on the backend.

mod buffer;
mod core;
mod refill;


pub use buffer::{group_by_uri, PrefetchBuffer, Reference};
pub use core::IndexPrefetcher;
