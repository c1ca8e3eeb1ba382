//! C15 — HTTP retrieval façade: binds the fixed route table from the
//! external-interfaces section to the query engine (C13). This module owns
//! request parsing, parameter validation and response shaping; everything
//! else is delegated.

pub mod routes;

use crate::query::QueryEngine;
use crate::store::Store;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub engine: QueryEngine,
    pub store: Arc<dyn Store>,
    pub model_name: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/search", post(routes::semantic_search))
        .route("/keyword-search", post(routes::keyword_search))
        .route("/hybrid-search", post(routes::hybrid_search))
        .route("/stats", get(routes::stats))
        .route("/repos", get(routes::repos))
        .route("/index/:repo_url", delete(routes::delete_index))
        .route("/definitions/:symbol", get(routes::definitions))
        .route("/usages/:symbol", get(routes::usages))
        .route("/import-tree/:file_path", get(routes::import_tree))
        .route("/circular-dependencies", get(routes::circular_dependencies))
        .route("/hub-files", get(routes::hub_files))
        .route("/callgraph/:function", get(routes::call_graph))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
