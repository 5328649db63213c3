//! Top-level service wiring

mod aggregation;
mod registry;

pub use aggregation::AggregationIds;
pub use registry::{PoolRuntime, StatusListService};
