//! Token serving handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, LAST_MODIFIED, VARY},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::api::conditional::{http_date, is_not_modified};
use crate::api::negotiation::negotiate;
use crate::api::state::AppState;
use crate::error::ServerError;

/// GET /:list_id
///
/// Serves the list's artifact in the negotiated format with validators
/// for conditional requests.
pub async fn get_status_list(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let format = negotiate(&headers)?;
    let token = state.service.token(&list_id, format).await?;

    let validators = [
        (ETAG, token.etag()),
        (LAST_MODIFIED, http_date(&token)),
        (CACHE_CONTROL, "no-cache".to_string()),
        (VARY, "Accept".to_string()),
    ];

    if is_not_modified(&headers, &token) {
        return Ok((StatusCode::NOT_MODIFIED, validators).into_response());
    }

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, format.media_type().to_string())],
        validators,
        Body::from(token.bytes.clone()),
    )
        .into_response())
}
