//! Test fixtures and app setup utilities

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use status_list_server::api::{create_router, AppState};
use status_list_server::background::BackgroundConfig;
use status_list_server::config::{Config, PoolConfig};
use status_list_server::stats::TracingStats;
use status_list_server::tokens::FileTokenRepository;
use status_list_server::traits::{StatsSink, Storage, TokenRepository};
use status_list_server::{KvStore, SqliteStore, StatusListService};
use tempfile::TempDir;
use tower::ServiceExt;

pub const POOL: &str = "test-pool";
pub const API_KEY: &str = "366A9069-2965-4667-9AD2-5C51D71046D8";
pub const PUBLIC_URL: &str = "https://status.example.com";

pub const JSON: &str = "application/statuslist+json";
pub const JWT: &str = "application/statuslist+jwt";
pub const CBOR: &str = "application/statuslist+cbor";
pub const CWT: &str = "application/statuslist+cwt";

/// A running service, its router and the directory holding its artifacts
pub struct TestApp {
    pub router: Router,
    pub service: Arc<StatusListService>,
    pub stats: Arc<TracingStats>,
    pub storage: Arc<dyn Storage>,
    pub config: Config,
    pub dir: TempDir,
}

/// bits=1, size=16 pool with a fixed signing seed
///
/// Prefetch capacity is the whole list (16) with a threshold of 8.
pub fn test_pool() -> PoolConfig {
    let mut pool = PoolConfig::new(1, 16, "https://issuer.example.com", API_KEY);
    pool.signer.seed_hex = Some("01".repeat(32));
    pool.signer.key_id = Some("test-key".to_string());
    pool
}

pub fn test_config(token_dir: &Path) -> Config {
    let mut config = Config {
        public_url: PUBLIC_URL.to_string(),
        storage_directory: token_dir.to_path_buf(),
        ..Config::default()
    };
    config.pools.insert(POOL.to_string(), test_pool());
    config
}

pub fn kv_store() -> Arc<dyn Storage> {
    Arc::new(KvStore::new(PUBLIC_URL))
}

pub fn sqlite_store() -> Arc<dyn Storage> {
    Arc::new(SqliteStore::in_memory(PUBLIC_URL).expect("Failed to create in-memory storage"))
}

/// Both backends, labelled for assertion messages
pub fn backends() -> Vec<(&'static str, Arc<dyn Storage>)> {
    vec![("kv", kv_store()), ("sqlite", sqlite_store())]
}

/// Service over the key-value backend with background jobs disabled
pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(dir.path());
    start_app(config, kv_store(), dir).await
}

/// Service over the given storage; artifacts go to `config.storage_directory`
pub async fn start_app(config: Config, storage: Arc<dyn Storage>, dir: TempDir) -> TestApp {
    let tokens: Arc<dyn TokenRepository> = Arc::new(
        FileTokenRepository::new(&config.storage_directory).expect("Failed to open token dir"),
    );
    let stats = Arc::new(TracingStats::new());

    let service = Arc::new(
        StatusListService::start(
            &config,
            Arc::clone(&storage),
            tokens,
            Arc::clone(&stats) as Arc<dyn StatsSink>,
            BackgroundConfig::disabled(),
        )
        .await
        .expect("Failed to start service"),
    );

    let router = create_router(Arc::new(AppState {
        service: Arc::clone(&service),
        stats: Arc::clone(&stats),
    }));

    TestApp {
        router,
        service,
        stats,
        storage,
        config,
        dir,
    }
}

// ========== Requests ==========

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn new_references_request(pool: &str, amount: Option<&str>, key: Option<&str>) -> Request<Body> {
    let uri = match amount {
        Some(amount) => format!("/pools/{pool}/new-references?amount={amount}"),
        None => format!("/pools/{pool}/new-references"),
    };
    let mut builder = Request::post(uri);
    if let Some(key) = key {
        builder = builder.header("X-Api-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn update_request(body: Value, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::patch("/status-lists/update").header("Content-Type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-Api-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn list_request(list_id: &str, accept: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(format!("/{list_id}"));
    if let Some(accept) = accept {
        builder = builder.header("Accept", accept);
    }
    builder.body(Body::empty()).unwrap()
}

/// Reserve through the HTTP surface and return `(uri, index)` pairs
pub async fn reserve(app: &TestApp, amount: usize) -> Vec<(String, u32)> {
    let response = send(
        &app.router,
        new_references_request(POOL, Some(&amount.to_string()), Some(API_KEY)),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    body_json(response).await["references"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["uri"].as_str().unwrap().to_string(),
                r["index"].as_u64().unwrap() as u32,
            )
        })
        .collect()
}

/// Trailing path segment of a list uri
pub fn list_id(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap()
}
