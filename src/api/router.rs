//! Router setup and configuration

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::api::handlers;
use crate::api::state::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/pools/:pool_id/new-references",
            post(handlers::new_references),
        )
        .route("/status-lists/update", patch(handlers::update_status))
        .route(
            "/aggregation/:aggregation_id",
            get(handlers::get_aggregation),
        )
        .route("/:list_id", get(handlers::get_status_list))
        .with_state(state)
}
