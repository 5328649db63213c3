//! Per-pool api key authentication
//!
//! The pool a request targets decides which keys are accepted, so the key
//! is extracted here and checked by the handler once the pool is known.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::config::PoolConfig;
use crate::error::{ServerError, ServerResult};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Value of the `X-Api-Key` header, if any
#[derive(Debug, Clone, Default)]
pub struct ApiKey(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ApiKey {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(API_KEY_HEADER) {
            None => Ok(ApiKey(None)),
            Some(value) => value
                .to_str()
                .map(|v| ApiKey(Some(v.to_string())))
                .map_err(|_| ServerError::AuthInvalid),
        }
    }
}

/// Check the presented key against the pool's configured key hashes
pub fn authorize(pool: &PoolConfig, key: &ApiKey) -> ServerResult<()> {
    let presented = key.0.as_deref().ok_or(ServerError::AuthMissing)?;
    if pool.accepts_api_key(presented) {
        Ok(())
    } else {
        Err(ServerError::AuthInvalid)
    }
}
