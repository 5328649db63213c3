//! Status update endpoint tests

use crate::common::*;
use serde_json::json;
use status_list_server::storage::{SqliteConfig, SqliteStore};
use status_list_server::Storage;

#[tokio::test]
async fn test_update_returns_no_content() {
    let app = test_app().await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    let response = send(
        &app.router,
        update_request(json!({ "uri": uri, "index": index, "value": 1 }), Some(API_KEY)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let list = app.storage.list_config(&uri, false).await.unwrap();
    assert_eq!(list.version, 2);
    assert_eq!(app.stats.snapshot().status_updates, 1);
}

#[tokio::test]
async fn test_update_can_be_reverted() {
    let app = test_app().await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    for value in [1, 0] {
        let response = send(
            &app.router,
            update_request(json!({ "uri": uri, "index": index, "value": value }), Some(API_KEY)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let data = app.storage.list_data(&uri).await.unwrap();
    assert!(data.iter().all(|b| *b == 0));
    assert_eq!(app.storage.list_config(&uri, false).await.unwrap().version, 3);
}

#[tokio::test]
async fn test_unknown_list_rejected() {
    let app = test_app().await;
    let uri = format!("{PUBLIC_URL}/{}", uuid::Uuid::new_v4());

    let response = send(
        &app.router,
        update_request(json!({ "uri": uri, "index": 0, "value": 1 }), Some(API_KEY)),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "NO_SUCH_LIST").await;
}

#[tokio::test]
async fn test_index_out_of_bounds_rejected() {
    let app = test_app().await;
    let (uri, _) = reserve(&app, 1).await.remove(0);

    for index in [16, -1] {
        let response = send(
            &app.router,
            update_request(json!({ "uri": uri, "index": index, "value": 1 }), Some(API_KEY)),
        )
        .await;
        let body = assert_error(response, StatusCode::BAD_REQUEST, "INDEX_OUT_OF_BOUNDS").await;
        assert_eq!(body["details"]["index"], index);
    }

    // Rejected writes leave the version alone
    assert_eq!(app.storage.list_config(&uri, false).await.unwrap().version, 1);
}

#[tokio::test]
async fn test_value_out_of_range_rejected() {
    let app = test_app().await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    for value in [2, -1] {
        let response = send(
            &app.router,
            update_request(json!({ "uri": uri, "index": index, "value": value }), Some(API_KEY)),
        )
        .await;
        assert_error(response, StatusCode::BAD_REQUEST, "VALUE_OUT_OF_RANGE").await;
    }
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = test_app().await;

    let request = Request::patch("/status-lists/update")
        .header("Content-Type", "application/json")
        .header("X-Api-Key", API_KEY)
        .body(Body::from("{not json"))
        .unwrap();
    assert_error(send(&app.router, request).await, StatusCode::BAD_REQUEST, "INVALID_ARGUMENT").await;

    let response = send(
        &app.router,
        update_request(json!({ "uri": "x", "index": 0 }), Some(API_KEY)),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_ARGUMENT").await;
}

#[tokio::test]
async fn test_persistent_write_conflict_is_409() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("status.db").to_string_lossy().to_string();
    let sqlite = SqliteConfig {
        path: db.clone(),
        busy_timeout_ms: 20,
        retry_attempts: 2,
        retry_backoff_ms: 10,
        ..Default::default()
    };
    let storage: Arc<dyn Storage> = Arc::new(SqliteStore::with_config(sqlite, PUBLIC_URL).unwrap());
    let app = start_app(test_config(&dir.path().join("tokens")), storage, dir).await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    // Another instance keeps the database write-locked
    let holder = rusqlite::Connection::open(&db).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();

    let response = send(
        &app.router,
        update_request(json!({ "uri": uri, "index": index, "value": 1 }), Some(API_KEY)),
    )
    .await;
    let json = assert_error(response, StatusCode::CONFLICT, "CONFLICT").await;
    assert_eq!(json["recoverable"], true);

    drop(holder);
    assert_eq!(app.storage.list_config(&uri, false).await.unwrap().version, 1);
}
