//! Status update handler

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::StatusCode,
};

use crate::api::dto::UpdateStatusRequest;
use crate::api::middleware::{authorize, ApiKey};
use crate::api::state::AppState;
use crate::error::ServerError;

/// Status update bodies are tiny
const MAX_BODY_BYTES: usize = 64 * 1024;

/// PATCH /status-lists/update
///
/// The pool owning the list decides which api keys are accepted.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    api_key: ApiKey,
    body: Body,
) -> Result<StatusCode, ServerError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ServerError::InvalidArgument(format!("Failed to read body: {}", e)))?;
    let req: UpdateStatusRequest = serde_json::from_slice(&bytes)
        .map_err(|e| ServerError::InvalidArgument(format!("Invalid JSON: {}", e)))?;

    let pool_id = state.service.pool_id(&req.uri).await?;
    let pool = state.service.pool_config(&pool_id)?;
    authorize(pool, &api_key)?;

    state
        .service
        .update_status(&req.uri, req.index, req.value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
