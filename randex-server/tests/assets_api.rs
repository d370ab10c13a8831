use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

use randex_core::{AssetIndex, Indexer, NoopRegistrar, PathStore};
use randex_server::{AppState, config::Config, create_app};

const PUBLIC_URL: &str = "http://localhost:3000";

fn test_config(asset_root: &Path) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        asset_root: asset_root.to_path_buf(),
        public_url: PUBLIC_URL.to_string(),
        asset_extensions: Vec::new(),
        database_path: asset_root.join("index.db"),
        rebuild_debounce: Duration::from_millis(100),
        cors_allowed_origins: Vec::new(),
        dev_mode: true,
    }
}

/// Build a server over a real temp asset tree, scanned once.
async fn setup(files: &[&str]) -> (TestServer, TempDir) {
    let tmp = TempDir::new().unwrap();
    for rel in files {
        let path = tmp.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"test-bytes").unwrap();
    }

    let store = PathStore::open_in_memory().await.unwrap();
    let index = AssetIndex::new();
    let indexer = Indexer::new(
        store.clone(),
        index.clone(),
        tmp.path().to_path_buf(),
        HashSet::new(),
        Arc::new(NoopRegistrar),
    );
    indexer.scan_all().await.unwrap();

    let state = AppState::new(Arc::new(test_config(tmp.path())), store, index);
    let server = TestServer::new(create_app(state)).unwrap();
    (server, tmp)
}

#[tokio::test]
async fn sample_json_returns_distinct_urls() {
    let (server, _tmp) = setup(&["photos/a.jpg", "photos/b.jpg", "photos/c.jpg"]).await;

    let response = server
        .get("/api/assets")
        .add_query_param("category", "photos")
        .add_query_param("count", "2")
        .await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 1);

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);

    let urls: Vec<&str> = data.iter().map(|item| item["url"].as_str().unwrap()).collect();
    assert_ne!(urls[0], urls[1]);
    for url in urls {
        assert!(url.starts_with(&format!("{PUBLIC_URL}/assets/photos/")));
    }
}

#[tokio::test]
async fn count_defaults_to_one() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    let response = server
        .get("/api/assets")
        .add_query_param("category", "photos")
        .await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 1);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_request_reports_insufficient_items() {
    let (server, _tmp) = setup(&["photos/a.jpg", "photos/b.jpg", "photos/c.jpg"]).await;

    let response = server
        .get("/api/assets")
        .add_query_param("category", "photos")
        .add_query_param("count", "4")
        .await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 0);
    assert!(json["error"].as_str().unwrap().contains("only has 3"));
}

#[tokio::test]
async fn invalid_counts_are_rejected() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    for count in ["0", "-2", "100", "5000", "abc"] {
        let response = server
            .get("/api/assets")
            .add_query_param("category", "photos")
            .add_query_param("count", count)
            .await;
        response.assert_status_ok();

        let json: Value = response.json();
        assert_eq!(json["code"], 0, "count={count} should be rejected");
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn unknown_category_is_an_error_envelope() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    let response = server
        .get("/api/assets")
        .add_query_param("category", "ghosts")
        .await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 0);
    assert!(json["error"].as_str().unwrap().contains("ghosts"));
}

#[tokio::test]
async fn missing_category_is_an_error_envelope() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    let response = server.get("/api/assets").await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 0);
}

#[tokio::test]
async fn unknown_response_type_is_rejected() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    let response = server
        .get("/api/assets")
        .add_query_param("category", "photos")
        .add_query_param("type", "xml")
        .await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 0);
}

#[tokio::test]
async fn file_mode_redirects_to_one_asset() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    let response = server
        .get("/api/assets")
        .add_query_param("category", "photos")
        .add_query_param("type", "file")
        .await;
    response.assert_status(StatusCode::SEE_OTHER);

    let location = response.header("location");
    assert_eq!(
        location.to_str().unwrap(),
        format!("{PUBLIC_URL}/assets/photos/a.jpg")
    );
}

#[tokio::test]
async fn categories_listing_is_sorted() {
    let (server, _tmp) = setup(&["photos/a.jpg", "gifs/b.gif", "wallpapers/c.png"]).await;

    let response = server.get("/api/categories").await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["code"], 1);
    assert_eq!(
        json["data"],
        serde_json::json!(["gifs", "photos", "wallpapers"])
    );
}

#[tokio::test]
async fn indexed_assets_are_served_statically() {
    let (server, _tmp) = setup(&["photos/a.jpg"]).await;

    let response = server.get("/assets/photos/a.jpg").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "test-bytes");
}

#[tokio::test]
async fn health_endpoint_answers() {
    let (server, _tmp) = setup(&[]).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}
