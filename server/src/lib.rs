use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use localsearch_core::{folder_key, EngineConfig, EngineError, EngineWorker, FolderSource, Pending, SearchHit, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;
const SNIPPET_BEFORE: usize = 40;
const SNIPPET_AFTER: usize = 120;

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub count: usize,
    pub results: Vec<ApiHit>,
}

#[derive(Serialize)]
pub struct ApiHit {
    pub doc_id: u32,
    pub score: u8,
    pub title: String,
    pub locator: String,
    pub snippet: String,
}

#[derive(Deserialize)]
pub struct FolderRequest {
    pub folder: String,
}

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Required in `X-ADMIN-TOKEN` for index mutations when set.
    pub admin_token: Option<String>,
    /// Comma-separated origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
    /// Folder whose saved index is loaded before serving.
    pub preload: Option<PathBuf>,
}

impl ServerOptions {
    pub fn from_env() -> Self {
        Self {
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
            preload: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<EngineWorker>,
    pub default_top_k: usize,
    pub admin_token: Option<String>,
}

pub fn build_app(config: EngineConfig, options: ServerOptions) -> Result<Router> {
    let engine = config.build_engine()?;
    let worker = EngineWorker::spawn(engine)?;
    if let Some(folder) = &options.preload {
        match worker.load_snapshot(folder_key(folder))?.wait() {
            Ok(()) => tracing::info!(folder = %folder.display(), docs = worker.status().total_docs, "index preloaded"),
            Err(e) if e.is_no_index() => tracing::warn!(folder = %folder.display(), error = %e, "no usable index; starting empty"),
            Err(e) => return Err(e.into()),
        }
    }
    let app_state = AppState { worker: Arc::new(worker), default_top_k: config.default_top_k, admin_token: options.admin_token };
    Ok(router(app_state, options.cors_allow_origin.as_deref()))
}

/// Routes over an already running worker.
pub fn router(app_state: AppState, cors_allow_origin: Option<&str>) -> Router {
    let cors = match cors_allow_origin {
        Some(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status_handler))
        .route("/search", get(search_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .route("/index/load", post(load_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn api_error(e: EngineError) -> ApiError {
    let status = match &e {
        EngineError::Busy | EngineError::WorkerGone => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::InvalidTopK => StatusCode::BAD_REQUEST,
        e if e.is_no_index() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// Waits for a worker job without blocking the async runtime.
async fn settle<T: Send + 'static>(pending: Pending<T>) -> Result<T, EngineError> {
    tokio::task::spawn_blocking(move || pending.wait())
        .await
        .unwrap_or_else(|e| Err(EngineError::Internal(format!("join error: {e}"))))
}

pub async fn status_handler(State(state): State<AppState>) -> Json<WorkerStatus> {
    Json(state.worker.status())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let k = params.k.unwrap_or(state.default_top_k).min(MAX_K);
    let pending = state.worker.query(params.q.clone(), k).map_err(api_error)?;
    let hits = settle(pending).await.map_err(api_error)?;

    let raw_terms: Vec<String> = params.q.split_whitespace().map(|s| s.to_string()).collect();
    let results: Vec<ApiHit> = hits.into_iter().map(|hit| to_api_hit(hit, &raw_terms)).collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), count: results.len(), results }))
}

pub async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap, Json(req): Json<FolderRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let folder = PathBuf::from(&req.folder);
    if !folder.is_dir() {
        return Err((StatusCode::BAD_REQUEST, format!("{} is not a directory", req.folder)));
    }
    tracing::info!(folder = %req.folder, "rebuild requested");

    let pending = state.worker.rebuild_and_save(FolderSource::new(&folder), &folder).map_err(api_error)?;
    let meta = settle(pending).await.map_err(api_error)?;

    Ok(Json(serde_json::json!({ "folder": req.folder, "key": meta.key, "indexed": meta.num_docs })))
}

pub async fn load_handler(State(state): State<AppState>, Json(req): Json<FolderRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let key = folder_key(&PathBuf::from(&req.folder));
    let pending = state.worker.load_snapshot(key.clone()).map_err(api_error)?;
    let loaded = match settle(pending).await {
        Ok(()) => true,
        Err(e) if e.is_no_index() => false,
        Err(e) => return Err(api_error(e)),
    };
    let total_docs = state.worker.status().total_docs;
    Ok(Json(serde_json::json!({ "folder": req.folder, "key": key, "loaded": loaded, "total_docs": total_docs })))
}

fn to_api_hit(hit: SearchHit, raw_terms: &[String]) -> ApiHit {
    let snippet = snippet(&hit.text, raw_terms);
    ApiHit { doc_id: hit.doc_id, score: hit.display_score, title: hit.title, locator: hit.locator, snippet }
}

fn snippet(text: &str, raw_terms: &[String]) -> String {
    let first = raw_terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| term_regex(t).and_then(|re| re.find(text)).map(|m| m.start()));
    let (start, end) = match first {
        Some(idx) => (idx.saturating_sub(SNIPPET_BEFORE), (idx + SNIPPET_AFTER).min(text.len())),
        None => (0, SNIPPET_AFTER.min(text.len())),
    };
    let window = &text[floor_boundary(text, start)..floor_boundary(text, end)];
    highlight_terms(window, raw_terms)
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn term_regex(term: &str) -> Option<regex::Regex> {
    regex::RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build().ok()
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        if let Some(pat) = term_regex(t) {
            s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
        }
    }
    s
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(required) = &state.admin_token else { return Ok(()) };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
