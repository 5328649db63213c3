//! API error response types

use crate::error::ServerError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};

/// API error response body
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Whether the error is recoverable (client can retry)
    pub recoverable: bool,

    /// Additional error details (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn details_for(error: &ServerError) -> Option<serde_json::Value> {
        match error {
            ServerError::IndexOutOfBounds { uri, index } => {
                Some(serde_json::json!({ "uri": uri, "index": index }))
            }
            ServerError::ValueOutOfRange { uri, value } => {
                Some(serde_json::json!({ "uri": uri, "value": value }))
            }
            ServerError::RateLimitReached(pool) => Some(serde_json::json!({ "pool": pool })),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
            details: ErrorResponse::details_for(&self),
        };

        (status, Json(body)).into_response()
    }
}
