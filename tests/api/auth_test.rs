//! Per-pool api key tests

use crate::common::*;
use serde_json::json;
use status_list_server::config::hash_api_key;
use status_list_server::PoolConfig;

#[tokio::test]
async fn test_missing_key_rejected() {
    let app = test_app().await;

    let response = send(&app.router, new_references_request(POOL, Some("1"), None)).await;
    let body = assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(body["message"], "Missing api key");
}

#[tokio::test]
async fn test_wrong_key_rejected() {
    let app = test_app().await;

    let response = send(
        &app.router,
        new_references_request(POOL, Some("1"), Some("wrong-key")),
    )
    .await;
    let body = assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(body["message"], "Invalid api key");
}

#[tokio::test]
async fn test_update_requires_key() {
    let app = test_app().await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    let response = send(
        &app.router,
        update_request(json!({ "uri": uri, "index": index, "value": 1 }), None),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(app.storage.list_config(&uri, false).await.unwrap().version, 1);
}

#[tokio::test]
async fn test_multiple_keys_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.pools.get_mut(POOL).unwrap().api_key_hashes =
        vec![hash_api_key("key-one"), hash_api_key("key-two")];
    let app = start_app(config, kv_store(), dir).await;

    for key in ["key-one", "key-two"] {
        let response = send(&app.router, new_references_request(POOL, Some("1"), Some(key))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_keys_are_scoped_to_their_pool() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.pools.insert(
        "other-pool".to_string(),
        PoolConfig::new(1, 16, "https://other.example.com", "other-key"),
    );
    let app = start_app(config, kv_store(), dir).await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    let response = send(
        &app.router,
        new_references_request(POOL, Some("1"), Some("other-key")),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;

    // The list's owning pool decides, not the key's pool
    let response = send(
        &app.router,
        update_request(json!({ "uri": uri, "index": index, "value": 1 }), Some("other-key")),
    )
    .await;
    assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;

    let response = send(
        &app.router,
        new_references_request("other-pool", Some("1"), Some("other-key")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
