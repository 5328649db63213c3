//! API integration tests
//!
//! Tests for HTTP endpoints:
//! - POST /pools/:pool_id/new-references
//! - PATCH /status-lists/update
//! - GET /:list_id (format negotiation, conditional requests)
//! - GET /aggregation/:aggregation_id
//! - GET /health
//! - Per-pool api key authentication

pub mod aggregation_test;
pub mod auth_test;
pub mod health_test;
pub mod lists_test;
pub mod references_test;
pub mod status_test;
