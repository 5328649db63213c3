//! Health endpoint tests

use crate::common::*;

#[tokio::test]
async fn test_health_reports_backend_and_pools() {
    let app = test_app().await;

    let response = send(
        &app.router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory-kv");
    assert_eq!(json["pools"], serde_json::json!([POOL]));
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_health_counts_engine_events() {
    let app = test_app().await;
    reserve(&app, 3).await;

    let response = send(
        &app.router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    let json = body_json(response).await;

    assert_eq!(json["stats"]["lists_created"], 1);
    assert_eq!(json["stats"]["indices_taken"], 16);
    assert_eq!(json["stats"]["indices_reserved"], 3);
}

#[tokio::test]
async fn test_health_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let app = start_app(config, sqlite_store(), dir).await;

    let response = send(
        &app.router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["backend"], "sqlite");
}
