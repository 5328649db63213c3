//! Data Transfer Objects for HTTP API

mod request;
mod response;

pub use request::{NewReferencesQuery, UpdateStatusRequest};
pub use response::{AggregationResponse, HealthResponse, NewReferencesResponse, ReferenceDto};
