//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure including:
//! - Service and router setup over either storage backend
//! - Request builders for the HTTP surface
//! - Assertions for error bodies and published lists

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;

// Re-export frequently used external types for convenience
pub use axum::body::Body;
pub use axum::http::{Request, StatusCode};
pub use std::sync::Arc;
pub use tower::ServiceExt;
