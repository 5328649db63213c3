//! HTTP API

pub mod conditional;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod negotiation;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
