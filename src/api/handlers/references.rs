//! Reference allocation handler

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::dto::{NewReferencesQuery, NewReferencesResponse, ReferenceDto};
use crate::api::middleware::{authorize, ApiKey};
use crate::api::state::AppState;
use crate::error::ServerError;

/// POST /pools/:pool_id/new-references?amount=N
///
/// Amount is validated before the pool is looked up, and the pool before
/// the api key.
pub async fn new_references(
    State(state): State<Arc<AppState>>,
    Path(pool_id): Path<String>,
    Query(query): Query<NewReferencesQuery>,
    api_key: ApiKey,
) -> Result<Json<NewReferencesResponse>, ServerError> {
    let amount = query.amount()?;
    let pool = state.service.pool_config(&pool_id)?;
    authorize(pool, &api_key)?;

    let references = state.service.reserve(&pool_id, amount).await?;
    tracing::debug!(pool_id = %pool_id, amount, "References handed out");

    Ok(Json(NewReferencesResponse {
        references: references.into_iter().map(ReferenceDto::from).collect(),
    }))
}
