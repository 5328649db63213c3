//! Aggregation handler

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::dto::AggregationResponse;
use crate::api::state::AppState;
use crate::error::ServerError;

/// GET /aggregation/:aggregation_id - every list of the pool
pub async fn get_aggregation(
    State(state): State<Arc<AppState>>,
    Path(aggregation_id): Path<String>,
) -> Result<Json<AggregationResponse>, ServerError> {
    let status_lists = state.service.lists_for_aggregation(&aggregation_id).await?;
    Ok(Json(AggregationResponse { status_lists }))
}
