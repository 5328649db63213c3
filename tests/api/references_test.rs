//! Reference allocation endpoint tests

use crate::common::*;

#[tokio::test]
async fn test_default_amount_is_one() {
    let app = test_app().await;

    let response = send(&app.router, new_references_request(POOL, None, Some(API_KEY))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let references = body["references"].as_array().unwrap();
    assert_eq!(references.len(), 1);
    assert!(references[0]["uri"]
        .as_str()
        .unwrap()
        .starts_with(PUBLIC_URL));
}

#[tokio::test]
async fn test_references_are_distinct_and_in_range() {
    let app = test_app().await;

    let references = reserve(&app, 5).await;
    assert_eq!(references.len(), 5);
    assert_distinct(&references);
    assert!(references.iter().all(|(_, index)| *index < 16));

    let more = reserve(&app, 5).await;
    let mut all = references;
    all.extend(more);
    assert_distinct(&all);
}

#[tokio::test]
async fn test_amount_below_one_rejected() {
    let app = test_app().await;

    for amount in ["0", "-2"] {
        let response = send(
            &app.router,
            new_references_request(POOL, Some(amount), Some(API_KEY)),
        )
        .await;
        assert_error(response, StatusCode::BAD_REQUEST, "VALUE_OUT_OF_RANGE").await;
    }
}

#[tokio::test]
async fn test_non_integer_amount_rejected() {
    let app = test_app().await;

    let response = send(
        &app.router,
        new_references_request(POOL, Some("lots"), Some(API_KEY)),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_ARGUMENT").await;
}

#[tokio::test]
async fn test_amount_checked_before_pool_and_key() {
    let app = test_app().await;

    // Unknown pool and no key: the amount error wins
    let response = send(&app.router, new_references_request("nope", Some("0"), None)).await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALUE_OUT_OF_RANGE").await;
}

#[tokio::test]
async fn test_unknown_pool_checked_before_key() {
    let app = test_app().await;

    let response = send(&app.router, new_references_request("nope", Some("1"), None)).await;
    assert_error(response, StatusCode::NOT_FOUND, "NO_SUCH_POOL").await;
}

#[tokio::test]
async fn test_request_beyond_buffer_is_rate_limited() {
    let app = test_app().await;

    let response = send(
        &app.router,
        new_references_request(POOL, Some("17"), Some(API_KEY)),
    )
    .await;
    let body = assert_error(response, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_REACHED").await;
    assert_eq!(body["recoverable"], true);
    assert_eq!(body["details"]["pool"], POOL);
    assert_eq!(app.stats.snapshot().indices_reserved, 0);

    // Nothing was lost: the full buffer is still there
    let references = reserve(&app, 16).await;
    assert_eq!(references.len(), 16);
    assert_distinct(&references);
}
