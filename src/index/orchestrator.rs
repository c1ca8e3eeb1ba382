//! C10 — Full and incremental indexing pipelines (spec §4.10).
//!
//! A full run re-chunks every indexable file in the working copy and
//! replaces a repo/branch's chunks, relationships and import edges
//! wholesale. An incremental run takes an externally supplied `ChangeSet`
//! (§6 `BASE_REF`/`CHANGED_FILES`) and only touches the files it names,
//! then rebuilds the graphs repo-wide since an edge can reference a file
//! that didn't itself change.

use crate::chunk::{self, config_file, ChunkerConfig};
use crate::diff::ChangeSet;
use crate::embed::cache::EmbeddingCache;
use crate::embed::Embedder;
use crate::error::IndexError;
use crate::extract::symbols;
use crate::graph::{call_graph, import_graph::ImportGraphBuilder, relationships};
use crate::language;
use crate::model::{self, Chunk, FileRecord};
use crate::query::QueryEngine;
use crate::runtime_config::RuntimeConfig;
use crate::store::Store;
use chrono::Utc;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// §6: files larger than this are excluded from scanning entirely.
pub const MAX_FILE_SIZE: u64 = 10_000_000;

const EXCLUDED_DIR_NAMES: &[&str] = &[
    "node_modules",
    "vendor",
    "venv",
    ".venv",
    "dist",
    "build",
    "out",
    "target",
    ".next",
    ".nuxt",
    "coverage",
    ".nyc_output",
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "__pycache__",
    ".cache",
    "__snapshots__",
];

const EXCLUDED_NAME_SUFFIXES: &[&str] = &[".lock", ".min.js", ".map"];

/// Stats reported by a single orchestrator run, serialized verbatim as the
/// CLI's closing `__RESULT__:<json>` line (§6).
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub chunks_inserted: u64,
    pub chunks_deleted: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub import_edges: u64,
    pub relationships: u64,
    pub cycles: u64,
    pub hubs: u64,
    pub elapsed_seconds: f64,
}

/// Hub files are reported at the same threshold as the query-path default
/// (§4.13 `hub_files`); the count is uncapped so the stat reflects the repo,
/// not a page of it.
const HUB_FILE_THRESHOLD: usize = 10;
const HUB_FILE_COUNT_LIMIT: usize = 100_000;
const CYCLE_MAX_LENGTH: usize = 10;

impl IndexStats {
    fn wrote_anything(&self) -> bool {
        self.chunks_inserted > 0 || self.chunks_deleted > 0
    }
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn Embedder>) -> Self {
        Orchestrator { store, embedder }
    }

    /// Returns `(stats, any_persistent_write_failed)`. The second element
    /// lets the CLI distinguish a clean run from one where every batch
    /// failed and nothing landed in the store (§7: batch SQL failures don't
    /// abort the run, but the exit code should still reflect them).
    pub async fn run_full(&self, cfg: &RuntimeConfig) -> Result<(IndexStats, bool), IndexError> {
        let start = Instant::now();
        self.store.migrate().await.map_err(|e| IndexError::Migration(e.to_string()))?;

        let repo_id = model::repo_id(&cfg.repo_url);
        info!(repo_id = %repo_id, branch = %cfg.repo_branch, "starting full index");

        let mut stats = IndexStats::default();
        let mut any_batch_failed = false;

        let existing_files: HashSet<String> = self
            .store
            .chunks_for_repo(&repo_id, &cfg.repo_branch)
            .await?
            .into_iter()
            .map(|c| c.file_path)
            .collect();
        for path in &existing_files {
            let deleted = self.store.delete_chunks_for_file(&repo_id, &cfg.repo_branch, path).await?;
            stats.chunks_deleted += deleted.len() as u64;
        }

        let repo_root = Path::new(&cfg.repo_path);
        let files = scan_files(repo_root);
        info!(count = files.len(), "files discovered for full index");

        any_batch_failed |= self.index_files(&repo_id, cfg, repo_root, &files, &mut stats).await?;
        self.rebuild_graphs(&repo_id, cfg, &mut stats).await?;

        stats.elapsed_seconds = start.elapsed().as_secs_f64();
        Ok((stats, any_batch_failed && !stats.wrote_anything()))
    }

    pub async fn run_incremental(&self, cfg: &RuntimeConfig, changes: ChangeSet) -> Result<(IndexStats, bool), IndexError> {
        let start = Instant::now();
        self.store.migrate().await.map_err(|e| IndexError::Migration(e.to_string()))?;
        let repo_id = model::repo_id(&cfg.repo_url);

        let changes = changes.filtered(|p| is_indexable_path(Path::new(p)));
        let mut stats = IndexStats::default();
        let mut any_batch_failed = false;
        if changes.is_empty() {
            stats.elapsed_seconds = start.elapsed().as_secs_f64();
            return Ok((stats, false));
        }
        info!(changed = changes.entries.len(), repo_id = %repo_id, "starting incremental index");

        for path in changes.modified_or_deleted().map(str::to_string).collect::<Vec<_>>() {
            let deleted = self.store.delete_chunks_for_file(&repo_id, &cfg.repo_branch, &path).await?;
            stats.chunks_deleted += deleted.len() as u64;
            self.store.delete_file_imports_touching(&repo_id, &cfg.repo_branch, &path).await?;
        }
        for path in changes
            .entries
            .iter()
            .filter(|e| e.status == crate::diff::ChangeStatus::Deleted)
            .map(|e| e.path.clone())
            .collect::<Vec<_>>()
        {
            self.store.delete_file_record(&repo_id, &cfg.repo_branch, &path).await?;
        }

        let repo_root = Path::new(&cfg.repo_path);
        let added_or_modified: Vec<PathBuf> = changes.added_or_modified().map(|p| repo_root.join(p)).collect();
        any_batch_failed |= self.index_files(&repo_id, cfg, repo_root, &added_or_modified, &mut stats).await?;

        self.rebuild_graphs(&repo_id, cfg, &mut stats).await?;
        stats.elapsed_seconds = start.elapsed().as_secs_f64();
        Ok((stats, any_batch_failed && !stats.wrote_anything()))
    }

    /// Chunk, hash, cache-check, embed and insert every file in `files`.
    /// Returns whether any chunk-insert batch failed.
    async fn index_files(
        &self,
        repo_id: &str,
        cfg: &RuntimeConfig,
        repo_root: &Path,
        files: &[PathBuf],
        stats: &mut IndexStats,
    ) -> Result<bool, IndexError> {
        let mut all_chunks: Vec<Chunk> = Vec::new();

        for abs_path in files {
            let rel_path = abs_path.strip_prefix(repo_root).unwrap_or(abs_path).to_string_lossy().replace('\\', "/");
            match self.chunk_one_file(repo_id, &cfg.repo_branch, abs_path, &rel_path, cfg.chunker) {
                Ok(Some((file_chunks, record))) => {
                    self.store.upsert_file(&record, &cfg.repo_url).await?;
                    all_chunks.extend(file_chunks);
                    stats.files_processed += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(file = %rel_path, error = %err, "skipping file");
                    stats.files_skipped += 1;
                }
            }
        }

        self.embed_and_insert(&mut all_chunks, cfg, stats).await
    }

    /// Re-chunk one file, parse its symbols and stamp the file-level import
    /// and export lists onto every chunk it produced (§4.4's "every chunk
    /// carries its file's whole import/export list").
    fn chunk_one_file(
        &self,
        repo_id: &str,
        branch: &str,
        abs_path: &Path,
        rel_path: &str,
        chunker_cfg: ChunkerConfig,
    ) -> Result<Option<(Vec<Chunk>, FileRecord)>, IndexError> {
        let metadata = std::fs::metadata(abs_path).map_err(|e| IndexError::FileSkipped(format!("{rel_path}: {e}")))?;
        let bytes = std::fs::read(abs_path).map_err(|e| IndexError::FileSkipped(format!("{rel_path}: {e}")))?;
        let content = String::from_utf8_lossy(&bytes).to_string();

        let mut chunks = chunk::chunk_file(Path::new(rel_path), &content, repo_id, branch, rel_path, chunker_cfg);
        if chunks.is_empty() {
            return Ok(None);
        }

        let file_symbols = symbols::extract(Path::new(rel_path), &content);
        symbols::backfill_file_level(&mut chunks, &file_symbols);

        let language = language::spec_for_path(Path::new(rel_path)).map(|s| s.id.to_string());
        let record = FileRecord {
            path: rel_path.to_string(),
            repo_id: repo_id.to_string(),
            branch: branch.to_string(),
            language,
            size: metadata.len(),
            last_modified: metadata.modified().map(chrono::DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now()),
        };
        Ok(Some((chunks, record)))
    }

    /// Batch cache-lookup, embed the misses (retrying once at halved batch
    /// size per §7 `EmbedFailure`), write embeddings back to the cache, and
    /// insert the resulting chunks in bounded-size transactional batches.
    /// Chunks whose embedding never resolves are dropped, never inserted.
    async fn embed_and_insert(&self, chunks: &mut Vec<Chunk>, cfg: &RuntimeConfig, stats: &mut IndexStats) -> Result<bool, IndexError> {
        if chunks.is_empty() {
            return Ok(false);
        }

        let cache = EmbeddingCache::new(self.store.clone(), self.embedder.model_name().to_string());
        let hashes: Vec<String> = chunks.iter().map(|c| c.content_hash.clone()).collect();
        let hits = cache.lookup(&hashes).await;

        let mut miss_indices = Vec::new();
        for (i, chunk) in chunks.iter_mut().enumerate() {
            if let Some(native) = hits.get(&chunk.content_hash) {
                chunk.embedding = model::pad_embedding(native);
                stats.cache_hits += 1;
            } else {
                miss_indices.push(i);
                stats.cache_misses += 1;
            }
        }

        let embed_batch_size = cfg.embed_batch.max(1);
        for batch in miss_indices.chunks(embed_batch_size).map(<[usize]>::to_vec).collect::<Vec<_>>() {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].content.clone()).collect();
            match self.embed_with_retry(&texts).await {
                Ok(vectors) => {
                    let mut cache_entries = Vec::with_capacity(batch.len());
                    for (&idx, native) in batch.iter().zip(vectors.into_iter()) {
                        cache_entries.push((chunks[idx].content_hash.clone(), native.clone()));
                        chunks[idx].embedding = model::pad_embedding(&native);
                    }
                    cache.store(&cache_entries).await?;
                }
                Err(err) => {
                    warn!(error = %err, batch_size = batch.len(), "embedding batch failed after retry, dropping its chunks");
                    for &idx in &batch {
                        chunks[idx].embedding.clear();
                    }
                }
            }
        }

        let mut usable: Vec<Chunk> = std::mem::take(chunks).into_iter().filter(|c| c.embedding.len() == model::D_PAD).collect();
        usable.sort_by(|a, b| a.id.cmp(&b.id));

        let mut any_batch_failed = false;
        for batch in usable.chunks(200) {
            match self.store.insert_chunks(batch).await {
                Ok(()) => stats.chunks_inserted += batch.len() as u64,
                Err(err) => {
                    warn!(error = %err, batch_size = batch.len(), "chunk insert batch failed, continuing with remaining batches");
                    any_batch_failed = true;
                }
            }
        }
        *chunks = usable;
        Ok(any_batch_failed)
    }

    /// Single retry at halved batch size on first failure (§7 `EmbedFailure`);
    /// the whole original batch is dropped if either half also fails.
    async fn embed_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        match self.embedder.embed_batch(texts) {
            Ok(vectors) => Ok(vectors),
            Err(first_err) => {
                if texts.len() <= 1 {
                    return Err(first_err);
                }
                let half = texts.len() / 2;
                let first_half = self.embedder.embed_batch(&texts[..half]);
                let second_half = self.embedder.embed_batch(&texts[half..]);
                match (first_half, second_half) {
                    (Ok(mut a), Ok(b)) => {
                        a.extend(b);
                        Ok(a)
                    }
                    _ => Err(first_err),
                }
            }
        }
    }

    /// Rebuild the import graph (C6), relationship edges (C7) and call
    /// graph (C8) repo-wide. All three are idempotent delete-then-insert for
    /// `(repo_id, branch)`, so a full rebuild after a partial re-chunk is
    /// always correct even though it's more work than diffing edges.
    async fn rebuild_graphs(&self, repo_id: &str, cfg: &RuntimeConfig, stats: &mut IndexStats) -> Result<(), IndexError> {
        let chunks = self.store.chunks_for_repo(repo_id, &cfg.repo_branch).await?;
        let indexed_files: HashSet<String> = chunks.iter().map(|c| c.file_path.clone()).collect();

        let builder = ImportGraphBuilder::new(&indexed_files);
        let mut seen_files: HashSet<&str> = HashSet::new();
        let mut file_imports = Vec::new();
        for chunk in &chunks {
            if !seen_files.insert(chunk.file_path.as_str()) {
                continue;
            }
            file_imports.extend(builder.edges_for_file(&chunk.file_path, &chunk.imports, repo_id, &cfg.repo_branch));
        }
        stats.import_edges = file_imports.len() as u64;
        self.store.replace_file_imports(repo_id, &cfg.repo_branch, &file_imports).await?;

        let mut edges = relationships::build(&chunks);
        edges.extend(call_graph::build(&chunks));
        stats.relationships = edges.len() as u64;
        self.store.replace_relationships(repo_id, &cfg.repo_branch, &edges).await?;

        let engine = QueryEngine::new(self.store.clone(), self.embedder.clone());
        stats.cycles = engine
            .circular_dependencies(&cfg.repo_url, &cfg.repo_branch, CYCLE_MAX_LENGTH)
            .await
            .map(|c| c.len() as u64)
            .unwrap_or(0);
        stats.hubs = engine
            .hub_files(&cfg.repo_url, &cfg.repo_branch, HUB_FILE_THRESHOLD, HUB_FILE_COUNT_LIMIT)
            .await
            .map(|h| h.len() as u64)
            .unwrap_or(0);

        info!(
            repo_id = %repo_id,
            import_edges = stats.import_edges,
            relationships = stats.relationships,
            cycles = stats.cycles,
            hubs = stats.hubs,
            "graph builders complete"
        );
        Ok(())
    }
}

/// Walk `repo_root`, keeping files that are indexable by extension or by
/// recognized config name, below the size cap, and outside any excluded
/// directory. Honors `.gitignore`/`.git/info/exclude` like the rest of the
/// indexable-source conventions in §6.
fn scan_files(repo_root: &Path) -> Vec<PathBuf> {
    let mut walker = WalkBuilder::new(repo_root);
    walker.hidden(false).git_ignore(true).git_global(true).git_exclude(true);

    let mut out = Vec::new();
    for entry in walker.build().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if is_excluded(path, repo_root) {
            continue;
        }
        if !is_indexable_path(path) {
            continue;
        }
        if entry.metadata().map(|m| m.len() > MAX_FILE_SIZE).unwrap_or(true) {
            continue;
        }
        out.push(path.to_path_buf());
    }
    out.sort();
    out
}

fn is_excluded(path: &Path, repo_root: &Path) -> bool {
    let rel = path.strip_prefix(repo_root).unwrap_or(path);
    rel.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        EXCLUDED_DIR_NAMES.contains(&name.as_ref()) || EXCLUDED_NAME_SUFFIXES.iter().any(|suf| name.ends_with(suf))
    })
}

fn is_indexable_path(path: &Path) -> bool {
    if language::is_indexable_extension(path) {
        return true;
    }
    let rel = path.to_string_lossy().replace('\\', "/");
    config_file::is_recognized_config_name(&rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_vendored_directories() {
        let root = Path::new("/repo");
        assert!(is_excluded(Path::new("/repo/node_modules/left-pad/index.js"), root));
        assert!(is_excluded(Path::new("/repo/target/debug/build.rs"), root));
        assert!(!is_excluded(Path::new("/repo/src/main.rs"), root));
    }

    #[test]
    fn excludes_lockfiles_and_sourcemaps() {
        let root = Path::new("/repo");
        assert!(is_excluded(Path::new("/repo/Cargo.lock"), root));
        assert!(is_excluded(Path::new("/repo/dist/app.min.js"), root));
        assert!(is_excluded(Path::new("/repo/dist/app.js.map"), root));
    }

    #[test]
    fn indexable_path_matches_extension_or_config_name() {
        assert!(is_indexable_path(Path::new("src/main.rs")));
        assert!(is_indexable_path(Path::new("Dockerfile")));
        assert!(is_indexable_path(Path::new(".github/workflows/ci.yml")));
        assert!(!is_indexable_path(Path::new("README")));
    }
}
