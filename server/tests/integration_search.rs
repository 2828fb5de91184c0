use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use crossbeam::channel::bounded;
use localsearch_core::{EngineConfig, EngineWorker, JobKind, SourceItem, TokenizerKind};
use serde_json::{json, Value};
use server::{build_app, router, AppState, ServerOptions};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tower::ServiceExt;

fn write_corpus(dir: &Path) {
    fs::write(dir.join("a.txt"), "Rust is great. rust systems programming.").unwrap();
    fs::write(dir.join("b.txt"), "Learning rust.").unwrap();
    fs::write(dir.join("c.txt"), "Python notes.").unwrap();
}

fn app(index_dir: &Path, options: ServerOptions) -> Router {
    let config = EngineConfig { index_dir: index_dir.to_path_buf(), tokenizer: TokenizerKind::Word, ..EngineConfig::default() };
    build_app(config, options).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Bytes) {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    if let Some(t) = token {
        builder = builder.header("X-ADMIN-TOKEN", t);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn rebuild_then_search_returns_ranked_results() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    write_corpus(corpus.path());
    let app = app(index.path(), ServerOptions::default());
    let folder = corpus.path().to_string_lossy().to_string();

    let (status, body) = post(&app, "/index/rebuild", json!({ "folder": folder }), None).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["indexed"], 3);

    let (status, body) = get(&app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["title"], "a.txt");
    assert_eq!(arr[0]["score"], 99);
    assert_eq!(arr[1]["title"], "b.txt");
    assert_eq!(arr[1]["score"], 69);
    assert!(arr[0]["snippet"].as_str().unwrap().contains("<em>Rust</em>"));

    let (status, body) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_docs"], 3);
}

#[tokio::test]
async fn zero_k_is_bad_request() {
    let index = tempdir().unwrap();
    let app = app(index.path(), ServerOptions::default());
    let (status, _) = get(&app, "/search?q=rust&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_index_returns_no_results() {
    let index = tempdir().unwrap();
    let app = app(index.path(), ServerOptions::default());
    let (status, body) = get(&app, "/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn load_reports_missing_and_saved_indexes() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    write_corpus(corpus.path());
    let folder = corpus.path().to_string_lossy().to_string();

    let first = app(index.path(), ServerOptions::default());
    let (status, body) = post(&first, "/index/load", json!({ "folder": folder }), None).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["loaded"], false);
    assert_eq!(json["total_docs"], 0);

    let (status, _) = post(&first, "/index/rebuild", json!({ "folder": folder }), None).await;
    assert_eq!(status, StatusCode::OK);
    drop(first);

    let second = app(index.path(), ServerOptions::default());
    let (status, body) = post(&second, "/index/load", json!({ "folder": folder }), None).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["loaded"], true);
    assert_eq!(json["total_docs"], 3);
}

#[tokio::test]
async fn preload_serves_saved_index() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    write_corpus(corpus.path());
    let folder = corpus.path().to_string_lossy().to_string();
    let first = app(index.path(), ServerOptions::default());
    post(&first, "/index/rebuild", json!({ "folder": folder }), None).await;
    drop(first);

    let options = ServerOptions { preload: Some(corpus.path().to_path_buf()), ..ServerOptions::default() };
    let second = app(index.path(), options);
    let (_, body) = get(&second, "/search?q=python").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"][0]["title"], "c.txt");
}

#[tokio::test]
async fn rebuild_requires_admin_token_when_configured() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    write_corpus(corpus.path());
    let options = ServerOptions { admin_token: Some("secret".into()), ..ServerOptions::default() };
    let app = app(index.path(), options);
    let folder = corpus.path().to_string_lossy().to_string();

    let (status, _) = post(&app, "/index/rebuild", json!({ "folder": folder }), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post(&app, "/index/rebuild", json!({ "folder": folder }), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post(&app, "/index/rebuild", json!({ "folder": folder }), Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rebuild_rejects_missing_folder() {
    let index = tempdir().unwrap();
    let app = app(index.path(), ServerOptions::default());
    let missing = index.path().join("nope").to_string_lossy().to_string();
    let (status, _) = post(&app, "/index/rebuild", json!({ "folder": missing }), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_on_a_saturated_worker_is_service_unavailable() {
    let index = tempdir().unwrap();
    let config = EngineConfig { index_dir: index.path().to_path_buf(), tokenizer: TokenizerKind::Word, ..EngineConfig::default() };
    let worker = Arc::new(EngineWorker::spawn(config.build_engine().unwrap()).unwrap());
    let app = router(AppState { worker: worker.clone(), default_top_k: 20, admin_token: None }, None);

    let (gate, items) = bounded::<SourceItem>(0);
    let rebuild = worker.begin_rebuild(items, None).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while worker.status().running != Some(JobKind::Rebuild) {
        assert!(Instant::now() < deadline, "rebuild never started");
        std::thread::sleep(Duration::from_millis(2));
    }
    let queued = worker.query("rust", 5).unwrap();

    let (status, _) = get(&app, "/search?q=rust").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    drop(gate);
    assert_eq!(rebuild.wait().unwrap(), 0);
    assert!(queued.wait().unwrap().is_empty());
    let (status, _) = get(&app, "/search?q=rust").await;
    assert_eq!(status, StatusCode::OK);
}
