//! Aggregation endpoint tests

use crate::common::*;

#[tokio::test]
async fn test_aggregation_lists_every_pool_list() {
    let app = test_app().await;

    let response = send(
        &app.router,
        Request::get(format!("/aggregation/{POOL}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let mut served: Vec<String> = body["status_lists"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    let mut stored = app.storage.all_list_uris(POOL).await.unwrap();
    served.sort();
    stored.sort();
    assert_eq!(served, stored);
    assert!(!served.is_empty());
}

#[tokio::test]
async fn test_configured_aggregation_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config
        .pools
        .get_mut(POOL)
        .unwrap()
        .aggregation_id = Some("everything".to_string());
    let app = start_app(config, kv_store(), dir).await;

    let ok = send(
        &app.router,
        Request::get("/aggregation/everything")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);

    // The pool id is no longer an aggregation id
    let missing = send(
        &app.router,
        Request::get(format!("/aggregation/{POOL}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_error(missing, StatusCode::NOT_FOUND, "NO_SUCH_POOL").await;
}

#[tokio::test]
async fn test_unknown_aggregation_not_found() {
    let app = test_app().await;

    let response = send(
        &app.router,
        Request::get("/aggregation/unknown")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_error(response, StatusCode::NOT_FOUND, "NO_SUCH_POOL").await;
}
