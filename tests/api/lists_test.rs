//! Token serving endpoint tests

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};

use crate::common::*;

async fn first_list(app: &TestApp) -> String {
    app.storage.all_list_uris(POOL).await.unwrap().remove(0)
}

#[tokio::test]
async fn test_json_artifact_of_fresh_list() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let response = send(&app.router, list_request(list_id(&uri), Some(JSON))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], JSON);
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["vary"], "Accept");
    assert!(headers["etag"].to_str().unwrap().starts_with('"'));
    assert!(headers["last-modified"].to_str().unwrap().ends_with("GMT"));

    let bytes = body_bytes(response).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["bits"], 1);
    assert_eq!(
        body["aggregation_uri"],
        format!("{PUBLIC_URL}/aggregation/{POOL}")
    );

    let list = decode_json_list(&bytes);
    assert_eq!(list.capacity(), 16);
    assert!((0..16).all(|i| list.get(i) == Some(0)));
}

#[tokio::test]
async fn test_default_format_is_jwt() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let response = send(&app.router, list_request(list_id(&uri), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], JWT);

    let token = String::from_utf8(body_bytes(response).await).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "compact JWS expected");

    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
    assert_eq!(header["typ"], "statuslist+jwt");
    assert_eq!(header["kid"], "test-key");

    let claims: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    assert_eq!(claims["sub"], uri);
    assert_eq!(claims["iss"], "https://issuer.example.com");
    assert_eq!(claims["status_list"]["bits"], 1);
    assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());
}

#[tokio::test]
async fn test_binary_formats_served() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    for media_type in [CBOR, CWT] {
        let response = send(&app.router, list_request(list_id(&uri), Some(media_type))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], media_type);
        assert!(!body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_q_values_pick_format() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let accept = format!("{JWT};q=0.2, {CBOR};q=0.9");
    let response = send(&app.router, list_request(list_id(&uri), Some(&accept))).await;
    assert_eq!(response.headers()["content-type"], CBOR);
}

#[tokio::test]
async fn test_unreadable_accept_rejected() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let response = send(&app.router, list_request(list_id(&uri), Some("garbage"))).await;
    assert_error(
        response,
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "UNSUPPORTED_MEDIA_TYPE",
    )
    .await;
}

#[tokio::test]
async fn test_unknown_list_not_found() {
    let app = test_app().await;

    let response = send(
        &app.router,
        list_request(&uuid::Uuid::new_v4().to_string(), Some(JSON)),
    )
    .await;
    assert_error(response, StatusCode::NOT_FOUND, "NO_SUCH_LIST").await;

    let response = send(&app.router, list_request("not-a-list", Some(JSON))).await;
    assert_error(response, StatusCode::NOT_FOUND, "NO_SUCH_LIST").await;
}

#[tokio::test]
async fn test_matching_etag_is_not_modified() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let response = send(&app.router, list_request(list_id(&uri), Some(JSON))).await;
    let etag = response.headers()["etag"].to_str().unwrap().to_string();

    let request = Request::get(format!("/{}", list_id(&uri)))
        .header("Accept", JSON)
        .header("If-None-Match", &etag)
        .body(Body::empty())
        .unwrap();
    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(response.headers()["etag"], etag.as_str());
    assert!(body_bytes(response).await.is_empty());

    let request = Request::get(format!("/{}", list_id(&uri)))
        .header("Accept", JSON)
        .header("If-None-Match", "\"12345\"")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wildcard_and_weak_etags_are_served() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let response = send(&app.router, list_request(list_id(&uri), Some(JSON))).await;
    let etag = response.headers()["etag"].to_str().unwrap().to_string();

    for condition in ["*".to_string(), format!("W/{etag}")] {
        let request = Request::get(format!("/{}", list_id(&uri)))
            .header("Accept", JSON)
            .header("If-None-Match", &condition)
            .body(Body::empty())
            .unwrap();
        let response = send(&app.router, request).await;
        assert_eq!(response.status(), StatusCode::OK, "{condition}");
        assert!(!body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_if_modified_since() {
    let app = test_app().await;
    let uri = first_list(&app).await;

    let response = send(&app.router, list_request(list_id(&uri), Some(JSON))).await;
    let last_modified = response.headers()["last-modified"]
        .to_str()
        .unwrap()
        .to_string();

    let request = Request::get(format!("/{}", list_id(&uri)))
        .header("Accept", JSON)
        .header("If-Modified-Since", &last_modified)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status(), StatusCode::NOT_MODIFIED);

    let request = Request::get(format!("/{}", list_id(&uri)))
        .header("Accept", JSON)
        .header("If-Modified-Since", "Mon, 01 Jan 2001 00:00:00 GMT")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_is_published_after_write_pass() {
    let app = test_app().await;
    let (uri, index) = reserve(&app, 1).await.remove(0);

    let before = send(&app.router, list_request(list_id(&uri), Some(JSON))).await;
    let old_etag = before.headers()["etag"].to_str().unwrap().to_string();

    let response = send(
        &app.router,
        update_request(json!({ "uri": uri, "index": index, "value": 1 }), Some(API_KEY)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Keep the rewritten artifact's mtime strictly later
    tokio::time::sleep(Duration::from_millis(20)).await;
    app.service.write_tokens().await.unwrap();

    let after = send(&app.router, list_request(list_id(&uri), Some(JSON))).await;
    assert_eq!(after.status(), StatusCode::OK);
    assert_ne!(after.headers()["etag"].to_str().unwrap(), old_etag);

    let list = decode_json_list(&body_bytes(after).await);
    assert_eq!(list.get(index), Some(1));
    let set = (0..16).filter(|i| list.get(*i) == Some(1)).count();
    assert_eq!(set, 1);
}
