//! Route handlers: one per row of the §6 HTTP table. Each parses its
//! request, calls the matching `QueryEngine` method, and shapes the
//! response; no business logic lives here.

use super::AppState;
use crate::error::QueryError;
use crate::query::{CallDirection, CallGraphResult, Cycle, DefinitionResult, HubFile, HybridSearchResponse, ImportTree, ScoredChunk, UsageResult};
use crate::search::hybrid::HybridWeights;
use crate::store::{RepoSummary, StatsSummary};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct ApiError(QueryError);

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            QueryError::InputInvalid(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            QueryError::Store(_) | QueryError::Embed(_) => {
                tracing::error!(error = %self.0, "query engine error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn default_limit() -> usize {
    20
}

fn default_max_cycle_length() -> usize {
    10
}

fn default_hub_threshold() -> usize {
    10
}

fn default_direction() -> String {
    "both".to_string()
}

fn default_call_depth() -> u32 {
    2
}

fn default_node_limit() -> usize {
    100
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_reachable = state.store.stats(None, None).await.is_ok();
    Json(serde_json::json!({
        "status": "ok",
        "store_reachable": store_reachable,
        "model_name": state.model_name,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn semantic_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<ScoredChunk>>, ApiError> {
    let results = state.engine.semantic_search(&req.query, req.repo_url.as_deref(), req.branch.as_deref(), req.limit).await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct KeywordSearchRequest {
    pub query: String,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub exact_match_boost: f32,
}

pub async fn keyword_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<KeywordSearchRequest>,
) -> Result<Json<Vec<ScoredChunk>>, ApiError> {
    let results = state
        .engine
        .keyword_search(&req.query, req.repo_url.as_deref(), req.branch.as_deref(), req.limit, req.exact_match_boost)
        .await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct HybridWeightsDto {
    pub vector: f32,
    pub keyword: f32,
}

#[derive(Debug, Deserialize)]
pub struct HybridSearchRequest {
    pub query: String,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub weights: Option<HybridWeightsDto>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub exact_match_boost: f32,
}

pub async fn hybrid_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HybridSearchRequest>,
) -> Result<Json<HybridSearchResponse>, ApiError> {
    let weights = req.weights.map(|w| HybridWeights { vector: w.vector, keyword: w.keyword });
    let response = state
        .engine
        .hybrid_search(&req.query, weights, req.limit, req.exact_match_boost, req.repo_url.as_deref(), req.branch.as_deref())
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct RepoBranchQuery {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
}

pub async fn stats(State(state): State<Arc<AppState>>, Query(q): Query<RepoBranchQuery>) -> Result<Json<StatsSummary>, ApiError> {
    let result = state.engine.stats(q.repo_url.as_deref(), q.branch.as_deref()).await?;
    Ok(Json(result))
}

pub async fn repos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RepoSummary>>, ApiError> {
    Ok(Json(state.engine.list_repos().await?))
}

#[derive(Debug, Serialize)]
pub struct DeleteIndexResponse {
    pub deleted_count: i64,
}

pub async fn delete_index(
    State(state): State<Arc<AppState>>,
    Path(repo_url): Path<String>,
    Query(_q): Query<RepoBranchQuery>,
) -> Result<Json<DeleteIndexResponse>, ApiError> {
    let deleted_count = state.engine.delete_repo(&repo_url).await?;
    Ok(Json(DeleteIndexResponse { deleted_count }))
}

#[derive(Debug, Deserialize)]
pub struct DefinitionsQuery {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default)]
    pub include_reexports: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn definitions(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(q): Query<DefinitionsQuery>,
) -> Result<Json<Vec<DefinitionResult>>, ApiError> {
    let results = state
        .engine
        .definitions(&symbol, q.repo_url.as_deref(), q.branch.as_deref(), q.include_reexports, q.limit)
        .await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct UsagesQuery {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn usages(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(q): Query<UsagesQuery>,
) -> Result<Json<Vec<UsageResult>>, ApiError> {
    let results = state.engine.usages(&symbol, q.repo_url.as_deref(), q.branch.as_deref(), q.limit).await?;
    Ok(Json(results))
}

pub async fn import_tree(
    State(state): State<Arc<AppState>>,
    Path(file_path): Path<String>,
    Query(q): Query<RepoBranchQuery>,
) -> Result<Json<ImportTree>, ApiError> {
    let repo_url = q.repo_url.ok_or_else(|| ApiError(QueryError::InputInvalid("repo_url is required".into())))?;
    let branch = q.branch.unwrap_or_else(|| "main".to_string());
    let tree = state.engine.import_tree(&file_path, &repo_url, &branch).await?;
    Ok(Json(tree))
}

#[derive(Debug, Deserialize)]
pub struct CircularDependenciesQuery {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default = "default_max_cycle_length")]
    pub max_cycle_length: usize,
}

pub async fn circular_dependencies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CircularDependenciesQuery>,
) -> Result<Json<Vec<Cycle>>, ApiError> {
    let repo_url = q.repo_url.ok_or_else(|| ApiError(QueryError::InputInvalid("repo_url is required".into())))?;
    let branch = q.branch.unwrap_or_else(|| "main".to_string());
    let cycles = state.engine.circular_dependencies(&repo_url, &branch, q.max_cycle_length).await?;
    Ok(Json(cycles))
}

#[derive(Debug, Deserialize)]
pub struct HubFilesQuery {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default = "default_hub_threshold")]
    pub threshold: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn hub_files(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HubFilesQuery>,
) -> Result<Json<Vec<HubFile>>, ApiError> {
    let repo_url = q.repo_url.ok_or_else(|| ApiError(QueryError::InputInvalid("repo_url is required".into())))?;
    let branch = q.branch.unwrap_or_else(|| "main".to_string());
    let hubs = state.engine.hub_files(&repo_url, &branch, q.threshold, q.limit).await?;
    Ok(Json(hubs))
}

#[derive(Debug, Deserialize)]
pub struct CallGraphQuery {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default = "default_call_depth")]
    pub depth: u32,
    #[serde(default = "default_node_limit")]
    pub limit: usize,
}

pub async fn call_graph(
    State(state): State<Arc<AppState>>,
    Path(function): Path<String>,
    Query(q): Query<CallGraphQuery>,
) -> Result<Json<CallGraphResult>, ApiError> {
    let direction = CallDirection::parse(&q.direction)?;
    let result = state
        .engine
        .call_graph(&function, direction, q.depth, q.repo_url.as_deref(), q.branch.as_deref(), q.limit)
        .await?;
    Ok(Json(result))
}
