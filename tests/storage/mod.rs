//! Storage layer integration tests
//!
//! Every test runs against both backends:
//! - Pool creation and verification
//! - Index allocation under concurrency
//! - Status writes and version counters
//! - Precreation leases

pub mod allocation_test;
pub mod lease_test;
pub mod pool_test;
pub mod status_test;
