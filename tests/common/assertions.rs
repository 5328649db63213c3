//! Custom test assertions for error bodies and published lists

use std::collections::HashSet;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use serde_json::Value;
use status_list_server::statuslist::{StatusList, StatusListJson};

use super::fixtures::body_json;

/// Assert status and error code of a failed request; returns the body
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) -> Value {
    assert_eq!(response.status(), status, "unexpected status for {code}");
    let body = body_json(response).await;
    assert_eq!(body["code"], code, "unexpected error body: {body}");
    assert!(body["message"].is_string(), "error body should carry a message");
    assert!(body["recoverable"].is_boolean(), "error body should carry recoverable");
    body
}

/// Assert that no (uri, index) pair appears twice
pub fn assert_distinct(references: &[(String, u32)]) {
    let unique: HashSet<&(String, u32)> = references.iter().collect();
    assert_eq!(
        unique.len(),
        references.len(),
        "duplicate reference handed out"
    );
}

/// Decode an `application/statuslist+json` artifact
pub fn decode_json_list(bytes: &[u8]) -> StatusList {
    let json: StatusListJson = serde_json::from_slice(bytes).expect("artifact should be JSON");
    json.decode().expect("artifact should decompress")
}
