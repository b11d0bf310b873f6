use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use docsearch_core::persist::{load_documents, load_index, IndexPaths};
use docsearch_core::SearchEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 5 }

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
    pub slug: String,
    pub title: String,
    pub score: f32,
}

#[derive(Clone)]
pub struct AppState {
    // loaded once at startup, read-only afterwards, shared without locks
    pub engine: Arc<SearchEngine>,
}

pub fn build_app(index_dir: &str) -> Result<Router> {
    let paths = IndexPaths::new(index_dir);
    let index = load_index(&paths)?;
    let documents = load_documents(&paths)?;

    let mut engine = SearchEngine::new();
    engine.load(index, documents)?;
    let state = AppState { engine: Arc::new(engine) };

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

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, 100);

    let hits = state
        .engine
        .search(&params.q)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;

    let total_hits = hits.len();
    let results: Vec<SearchHit> = hits
        .into_iter()
        .take(k)
        .map(|h| SearchHit { doc_id: h.doc_id, slug: h.slug, title: h.title, score: h.score })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits,
        results,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let meta = state
        .engine
        .document(doc_id)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    match meta {
        Some(meta) => Ok(Json(serde_json::json!({
            "doc_id": doc_id,
            "slug": meta.slug,
            "title": meta.title,
        }))),
        None => Err((StatusCode::NOT_FOUND, format!("no document {doc_id}"))),
    }
}
