//! Integration tests for the query engine (C13) against an in-memory fake
//! `Store`, per the test-tooling plan: no Postgres needed to exercise
//! definitions/usages/import-tree/cycle/hub-file logic end to end.

use async_trait::async_trait;
use codegraph_lens::error::StoreError;
use codegraph_lens::error::IndexError;
use codegraph_lens::embed::Embedder;
use codegraph_lens::model::{
    self, Chunk, ChunkType, EmbeddingCacheEntry, FileImport, FileRecord, ImportType, Relationship, RelationshipType,
};
use codegraph_lens::query::{CallDirection, CycleType, QueryEngine, UsageType};
use codegraph_lens::store::{RepoSummary, StatsSummary, Store};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct FakeStore {
    files: Mutex<HashMap<(String, String, String), FileRecord>>,
    chunks: Mutex<HashMap<Uuid, Chunk>>,
    relationships: Mutex<Vec<Relationship>>,
    file_imports: Mutex<Vec<FileImport>>,
}

#[async_trait]
impl Store for FakeStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_file(&self, file: &FileRecord, _repo_url: &str) -> Result<(), StoreError> {
        self.files.lock().unwrap().insert((file.repo_id.clone(), file.branch.clone(), file.path.clone()), file.clone());
        Ok(())
    }

    async fn delete_file_record(&self, repo_id: &str, branch: &str, path: &str) -> Result<(), StoreError> {
        self.files.lock().unwrap().remove(&(repo_id.to_string(), branch.to_string(), path.to_string()));
        Ok(())
    }

    async fn delete_chunks_for_file(&self, repo_id: &str, branch: &str, path: &str) -> Result<Vec<Uuid>, StoreError> {
        let mut chunks = self.chunks.lock().unwrap();
        let doomed: Vec<Uuid> = chunks
            .values()
            .filter(|c| c.repo_id == repo_id && c.branch == branch && c.file_path == path)
            .map(|c| c.id)
            .collect();
        for id in &doomed {
            chunks.remove(id);
        }
        Ok(doomed)
    }

    async fn insert_chunks(&self, new_chunks: &[Chunk]) -> Result<(), StoreError> {
        let mut chunks = self.chunks.lock().unwrap();
        for chunk in new_chunks {
            chunks.insert(chunk.id, chunk.clone());
        }
        Ok(())
    }

    async fn chunks_for_repo(&self, repo_id: &str, branch: &str) -> Result<Vec<Chunk>, StoreError> {
        Ok(self.chunks.lock().unwrap().values().filter(|c| c.repo_id == repo_id && c.branch == branch).cloned().collect())
    }

    async fn chunk_by_id(&self, id: Uuid) -> Result<Option<Chunk>, StoreError> {
        Ok(self.chunks.lock().unwrap().get(&id).cloned())
    }

    async fn replace_relationships(&self, repo_id: &str, branch: &str, relationships: &[Relationship]) -> Result<(), StoreError> {
        let chunk_repo: HashMap<Uuid, (String, String)> =
            self.chunks.lock().unwrap().values().map(|c| (c.id, (c.repo_id.clone(), c.branch.clone()))).collect();
        let mut all = self.relationships.lock().unwrap();
        all.retain(|r| chunk_repo.get(&r.source_chunk_id).map(|(ri, b)| ri != repo_id || b != branch).unwrap_or(true));
        all.extend(relationships.iter().cloned());
        Ok(())
    }

    async fn relationships_from(&self, chunk_id: Uuid) -> Result<Vec<Relationship>, StoreError> {
        Ok(self.relationships.lock().unwrap().iter().filter(|r| r.source_chunk_id == chunk_id).cloned().collect())
    }

    async fn relationships_to(&self, chunk_id: Uuid) -> Result<Vec<Relationship>, StoreError> {
        Ok(self.relationships.lock().unwrap().iter().filter(|r| r.target_chunk_id == chunk_id).cloned().collect())
    }

    async fn delete_file_imports_touching(&self, repo_id: &str, branch: &str, path: &str) -> Result<(), StoreError> {
        self.file_imports
            .lock()
            .unwrap()
            .retain(|e| !(e.repo_id == repo_id && e.branch == branch && (e.source_file == path || e.target_file == path)));
        Ok(())
    }

    async fn replace_file_imports(&self, repo_id: &str, branch: &str, imports: &[FileImport]) -> Result<(), StoreError> {
        let mut all = self.file_imports.lock().unwrap();
        all.retain(|e| e.repo_id != repo_id || e.branch != branch);
        all.extend(imports.iter().cloned());
        Ok(())
    }

    async fn all_file_imports(&self, repo_id: &str, branch: &str) -> Result<Vec<FileImport>, StoreError> {
        Ok(self.file_imports.lock().unwrap().iter().filter(|e| e.repo_id == repo_id && e.branch == branch).cloned().collect())
    }

    async fn cache_lookup(&self, _hashes: &[String], _model: &str) -> Result<HashMap<String, Vec<f32>>, StoreError> {
        Ok(HashMap::new())
    }

    async fn cache_store(&self, _entries: &[EmbeddingCacheEntry]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn semantic_search(
        &self,
        _embedding: &[f32],
        repo_id: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Chunk, f32)>, StoreError> {
        let mut rows: Vec<(Chunk, f32)> = self
            .chunks
            .lock()
            .unwrap()
            .values()
            .filter(|c| repo_id.map(|r| r == c.repo_id).unwrap_or(true) && branch.map(|b| b == c.branch).unwrap_or(true))
            .map(|c| (c.clone(), 1.0))
            .collect();
        rows.truncate(limit);
        Ok(rows)
    }

    async fn keyword_search(
        &self,
        _tsquery_expr: &str,
        repo_id: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Chunk, f32)>, StoreError> {
        self.semantic_search(&[], repo_id, branch, limit).await
    }

    async fn definitions(&self, symbol: &str, repo_id: Option<&str>, branch: Option<&str>) -> Result<Vec<Chunk>, StoreError> {
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .values()
            .filter(|c| repo_id.map(|r| r == c.repo_id).unwrap_or(true) && branch.map(|b| b == c.branch).unwrap_or(true))
            .filter(|c| c.symbol_name.as_deref() == Some(symbol) || c.symbol_names.iter().any(|s| s == symbol))
            .cloned()
            .collect())
    }

    async fn stats(&self, repo_id: Option<&str>, branch: Option<&str>) -> Result<StatsSummary, StoreError> {
        let chunks = self.chunks.lock().unwrap();
        let matching: Vec<&Chunk> = chunks
            .values()
            .filter(|c| repo_id.map(|r| r == c.repo_id).unwrap_or(true) && branch.map(|b| b == c.branch).unwrap_or(true))
            .collect();
        let files = self.files.lock().unwrap();
        Ok(StatsSummary {
            repo_id: repo_id.map(str::to_string),
            branch: branch.map(str::to_string),
            file_count: files.len() as i64,
            chunk_count: matching.len() as i64,
            relationship_count: self.relationships.lock().unwrap().len() as i64,
        })
    }

    async fn list_repos(&self) -> Result<Vec<RepoSummary>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_repo(&self, repo_url: &str) -> Result<i64, StoreError> {
        let repo_id = model::repo_id(repo_url);
        let mut chunks = self.chunks.lock().unwrap();
        let before = chunks.len();
        chunks.retain(|_, c| c.repo_id != repo_id);
        Ok((before - chunks.len()) as i64)
    }
}

struct FakeEmbedder;

impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }

    fn native_dim(&self) -> usize {
        4
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
    }
}

fn make_chunk(repo_id: &str, file_path: &str, symbol: &str, content: &str, line_start: u32, line_end: u32) -> Chunk {
    let id = model::chunk_id(repo_id, "main", file_path, line_start, line_end);
    Chunk {
        id,
        file_path: file_path.to_string(),
        repo_id: repo_id.to_string(),
        branch: "main".to_string(),
        language: Some("rust".to_string()),
        chunk_type: ChunkType::Function,
        symbol_name: Some(symbol.to_string()),
        symbol_names: vec![symbol.to_string()],
        imports: Vec::new(),
        exports: vec![symbol.to_string()],
        line_start,
        line_end,
        content: content.to_string(),
        content_hash: model::content_hash(content),
        embedding: model::pad_embedding(&[0.1, 0.2]),
        full_text_index: content.to_string(),
    }
}

fn import(repo_id: &str, src: &str, dst: &str) -> FileImport {
    FileImport {
        source_file: src.into(),
        target_file: dst.into(),
        repo_id: repo_id.into(),
        branch: "main".into(),
        import_type: ImportType::Static,
        imported_symbols: Vec::new(),
    }
}

fn engine_with_fixture() -> (QueryEngine, String, Chunk, Chunk) {
    let repo_url = "https://example.com/widgets";
    let repo_id = model::repo_id(repo_url);

    let chunk_a = make_chunk(&repo_id, "src/a.rs", "foo", "fn foo() {}", 1, 1);
    let chunk_b = make_chunk(&repo_id, "src/b.rs", "bar", "fn bar() { foo(); }", 1, 1);

    let store = FakeStore::default();
    store.chunks.lock().unwrap().insert(chunk_a.id, chunk_a.clone());
    store.chunks.lock().unwrap().insert(chunk_b.id, chunk_b.clone());
    store.relationships.lock().unwrap().push(Relationship {
        source_chunk_id: chunk_b.id,
        target_chunk_id: chunk_a.id,
        relationship_type: RelationshipType::Calls,
        metadata: serde_json::json!({"callee_name": "foo", "line": 1}),
    });
    *store.file_imports.lock().unwrap() = vec![
        import(&repo_id, "src/a.rs", "src/c.rs"),
        import(&repo_id, "src/c.rs", "src/b.rs"),
        import(&repo_id, "src/b.rs", "src/a.rs"),
        import(&repo_id, "src/e.rs", "src/d.rs"),
        import(&repo_id, "src/f.rs", "src/d.rs"),
        import(&repo_id, "src/g.rs", "src/d.rs"),
    ];

    let engine = QueryEngine::new(Arc::new(store), Arc::new(FakeEmbedder));
    (engine, repo_url.to_string(), chunk_a, chunk_b)
}

#[tokio::test]
async fn definitions_finds_matching_symbol() {
    let (engine, repo_url, chunk_a, _chunk_b) = engine_with_fixture();
    let results = engine.definitions("foo", Some(&repo_url), Some("main"), false, 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, chunk_a.id);
    assert!(!results[0].is_reexport);
}

#[tokio::test]
async fn usages_follows_call_edge_back_to_caller() {
    let (engine, repo_url, _chunk_a, chunk_b) = engine_with_fixture();
    let results = engine.usages("foo", Some(&repo_url), Some("main"), 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, chunk_b.id);
    assert_eq!(results[0].usage_type, UsageType::Calls);
    assert!(!results[0].is_dynamic);
}

#[tokio::test]
async fn import_tree_reports_direct_and_indirect_edges() {
    let (engine, repo_url, ..) = engine_with_fixture();
    let tree = engine.import_tree("src/a.rs", &repo_url, "main").await.unwrap();
    assert_eq!(tree.direct_imports, vec!["src/c.rs".to_string()]);
    assert_eq!(tree.direct_importers, vec!["src/b.rs".to_string()]);
    assert_eq!(tree.indirect_imports, vec!["src/b.rs".to_string()]);
}

#[tokio::test]
async fn circular_dependencies_finds_the_three_file_cycle() {
    let (engine, repo_url, ..) = engine_with_fixture();
    let cycles = engine.circular_dependencies(&repo_url, "main", 10).await.unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].cycle_type, CycleType::Indirect);
    let mut nodes = cycles[0].nodes.clone();
    nodes.sort();
    assert_eq!(nodes, vec!["src/a.rs".to_string(), "src/b.rs".to_string(), "src/c.rs".to_string()]);
}

#[tokio::test]
async fn hub_files_flags_file_with_many_importers() {
    let (engine, repo_url, ..) = engine_with_fixture();
    let hubs = engine.hub_files(&repo_url, "main", 3, 10).await.unwrap();
    assert_eq!(hubs.len(), 1);
    assert_eq!(hubs[0].file, "src/d.rs");
    assert_eq!(hubs[0].in_degree, 3);
}

#[tokio::test]
async fn call_graph_walks_one_hop_of_callees() {
    let (engine, repo_url, chunk_a, chunk_b) = engine_with_fixture();
    let result = engine.call_graph("bar", CallDirection::Callees, 1, Some(&repo_url), Some("main"), 10).await.unwrap();
    assert!(result.nodes.iter().any(|n| n.chunk_id == chunk_b.id && n.depth == 0));
    assert!(result.nodes.iter().any(|n| n.chunk_id == chunk_a.id && n.depth == 1));
    assert_eq!(result.edges.len(), 1);
    assert_eq!(result.edges[0].callee_name, "foo");
}

#[tokio::test]
async fn verify_integrity_reports_no_violations_on_clean_fixture() {
    let (engine, repo_url, ..) = engine_with_fixture();
    let report = engine.verify_integrity(&repo_url, "main").await.unwrap();
    assert!(report.violations.is_empty(), "unexpected violations: {:?}", report.violations);
}

#[tokio::test]
async fn verify_integrity_flags_overlapping_chunks() {
    let repo_url = "https://example.com/overlap";
    let repo_id = model::repo_id(repo_url);
    let mut a = make_chunk(&repo_id, "src/a.rs", "foo", "fn foo() {}", 1, 10);
    let mut b = make_chunk(&repo_id, "src/a.rs", "bar", "fn bar() {}", 5, 15);
    a.id = Uuid::new_v4();
    b.id = Uuid::new_v4();

    let store = FakeStore::default();
    store.chunks.lock().unwrap().insert(a.id, a);
    store.chunks.lock().unwrap().insert(b.id, b);
    let engine = QueryEngine::new(Arc::new(store), Arc::new(FakeEmbedder));

    let report = engine.verify_integrity(repo_url, "main").await.unwrap();
    assert!(report.violations.iter().any(|v| v.kind == "overlap"));
}

#[tokio::test]
async fn delete_repo_removes_only_that_repos_chunks() {
    let (engine, repo_url, ..) = engine_with_fixture();
    let deleted = engine.delete_repo(&repo_url).await.unwrap();
    assert_eq!(deleted, 2);
    let stats = engine.stats(Some(&repo_url), Some("main")).await.unwrap();
    assert_eq!(stats.chunk_count, 0);
}

/// Gated on a real database: `DATABASE_URL=postgres://... cargo test -- --ignored`.
#[tokio::test]
#[ignore]
async fn postgres_store_connects_and_migrates() {
    let database_url = std::env::var("DATABASE_URL").expect("set DATABASE_URL to run this test");
    let store = codegraph_lens::store::postgres::PostgresStore::connect(&database_url).await.unwrap();
    store.migrate().await.unwrap();
}
