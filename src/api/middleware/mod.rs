//! Request guards

pub mod auth;

pub use auth::{authorize, ApiKey, API_KEY_HEADER};
