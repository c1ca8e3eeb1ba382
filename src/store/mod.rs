//! Persistence boundary (§6 "external collaborator"): a `Store` trait plus
//! the one concrete implementation, Postgres via `sqlx`/`pgvector`. Every
//! other component reaches the database only through this trait so the
//! indexing and query engines stay testable against an in-memory fake.

pub mod postgres;
pub mod schema;

use crate::error::StoreError;
use crate::model::{Chunk, EmbeddingCacheEntry, FileImport, FileRecord, Relationship};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSummary {
    pub repo_id: Option<String>,
    pub branch: Option<String>,
    pub file_count: i64,
    pub chunk_count: i64,
    pub relationship_count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RepoSummary {
    pub repo_id: String,
    pub repo_url: String,
    pub branches: Vec<String>,
    pub chunk_count: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn migrate(&self) -> Result<(), StoreError>;

    async fn upsert_file(&self, file: &FileRecord, repo_url: &str) -> Result<(), StoreError>;
    async fn delete_file_record(&self, repo_id: &str, branch: &str, path: &str) -> Result<(), StoreError>;

    /// Deletes a file's chunks (and cascading relationships, per FK) and
    /// returns the deleted chunk ids so the caller can also drop anything
    /// anchored to them outside the cascade (e.g. stale file_imports).
    async fn delete_chunks_for_file(&self, repo_id: &str, branch: &str, path: &str) -> Result<Vec<Uuid>, StoreError>;
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<(), StoreError>;
    async fn chunks_for_repo(&self, repo_id: &str, branch: &str) -> Result<Vec<Chunk>, StoreError>;
    async fn chunk_by_id(&self, id: Uuid) -> Result<Option<Chunk>, StoreError>;

    async fn replace_relationships(
        &self,
        repo_id: &str,
        branch: &str,
        relationships: &[Relationship],
    ) -> Result<(), StoreError>;
    async fn relationships_from(&self, chunk_id: Uuid) -> Result<Vec<Relationship>, StoreError>;
    async fn relationships_to(&self, chunk_id: Uuid) -> Result<Vec<Relationship>, StoreError>;

    async fn delete_file_imports_touching(&self, repo_id: &str, branch: &str, path: &str) -> Result<(), StoreError>;
    async fn replace_file_imports(&self, repo_id: &str, branch: &str, imports: &[FileImport]) -> Result<(), StoreError>;
    async fn all_file_imports(&self, repo_id: &str, branch: &str) -> Result<Vec<FileImport>, StoreError>;

    async fn cache_lookup(&self, hashes: &[String], model: &str) -> Result<HashMap<String, Vec<f32>>, StoreError>;
    async fn cache_store(&self, entries: &[EmbeddingCacheEntry]) -> Result<(), StoreError>;

    async fn semantic_search(
        &self,
        embedding: &[f32],
        repo_id: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Chunk, f32)>, StoreError>;

    async fn keyword_search(
        &self,
        tsquery_expr: &str,
        repo_id: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Chunk, f32)>, StoreError>;

    async fn definitions(&self, symbol: &str, repo_id: Option<&str>, branch: Option<&str>) -> Result<Vec<Chunk>, StoreError>;

    async fn stats(&self, repo_id: Option<&str>, branch: Option<&str>) -> Result<StatsSummary, StoreError>;
    async fn list_repos(&self) -> Result<Vec<RepoSummary>, StoreError>;
    async fn delete_repo(&self, repo_url: &str) -> Result<i64, StoreError>;
}
