use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pubsearch_core::persist::{load_meta, IndexPaths, MetaFile};
use pubsearch_core::{Document, LoadError, SnapshotHandle, SnapshotStats};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: u32,
    #[serde(flatten)]
    pub doc: Document,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: u32,
    #[serde(flatten)]
    pub doc: Document,
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: SnapshotStats,
    pub meta: Option<MetaFile>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub snapshots: SnapshotHandle,
    pub index_paths: IndexPaths,
    pub admin_token: Option<String>,
}

/// Handler errors, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound(_) => ApiError::NotFound(e.to_string()),
            LoadError::VersionMismatch { .. } => ApiError::Conflict(e.to_string()),
            LoadError::Corrupt(_) => ApiError::Unprocessable(e.to_string()),
            LoadError::Io(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl AppState {
    /// Load the snapshot under `index_dir`. There is no empty fallback: a
    /// server without a readable artifact does not start.
    pub fn open(index_dir: &str, admin_token: Option<String>) -> Result<Self, LoadError> {
        let index_paths = IndexPaths::new(index_dir);
        let snapshots = SnapshotHandle::open(&index_paths)?;
        Ok(Self { snapshots, index_paths, admin_token })
    }
}

pub fn build_app(index_dir: String) -> Result<Router> {
    let state = AppState::open(&index_dir, std::env::var("ADMIN_TOKEN").ok())?;
    Ok(router(state))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
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
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let snapshot = state.snapshots.current();
    let hits = snapshot.search_hits(&params.q).map_err(|e| {
        tracing::error!(error = %e, query = %params.q, "search failed");
        ApiError::Internal(e.to_string())
    })?;

    let total_hits = hits.len();
    let k = params.k.clamp(1, MAX_K);
    let results = hits
        .into_iter()
        .take(k)
        .filter_map(|h| snapshot.doc(h.doc_id).map(|doc| SearchHit { doc_id: h.doc_id, score: h.score, doc: doc.clone() }))
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits, took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Result<Json<DocResponse>, ApiError> {
    let snapshot = state.snapshots.current();
    match snapshot.doc(doc_id) {
        Some(doc) => Ok(Json(DocResponse { doc_id, doc: doc.clone() })),
        None => Err(ApiError::NotFound(format!("document {doc_id} not found"))),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.snapshots.current().stats();
    let meta = load_meta(&state.index_paths)?;
    Ok(Json(StatsResponse { stats, meta }))
}

/// Load the artifact from the index directory and swap it in.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<SnapshotStats>, ApiError> {
    authorize(&state, &headers)?;
    let AppState { snapshots, index_paths, .. } = state;
    let stats = tokio::task::spawn_blocking(move || snapshots.reload(&index_paths))
        .await
        .map_err(|e| ApiError::Internal(format!("reload task failed: {e}")))??;
    Ok(Json(stats))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
