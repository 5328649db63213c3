//! Health check handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health - storage health plus engine counters
///
/// Returns 200 OK if the backend is healthy, 503 Service Unavailable if not.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let healthy = state.service.is_healthy();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        backend: state.service.storage().backend_name().to_string(),
        pools: state.service.pool_ids().map(String::from).collect(),
        stats: state.stats.snapshot(),
        error: (!healthy).then(|| "Storage unavailable".to_string()),
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
