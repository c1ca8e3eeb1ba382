//! C13 — Query engine (spec §4.13).
//!
//! Every method is read-only: semantic/keyword/hybrid search delegate to
//! C11/C12 and the store's ANN/full-text indexes; definitions/usages/import
//! tree/cycles/hubs/call graph walk the chunk and relationship rows already
//! written by the graph builders (C6/C7/C8). `verify_integrity` is the B.4
//! supplemented invariant checker — not on the HTTP surface, library-only.

use crate::embed::Embedder;
use crate::error::QueryError;
use crate::model::{self, Chunk, RelationshipType};
use crate::search::{bm25, hybrid};
use crate::store::{RepoSummary, StatsSummary, Store};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

pub struct QueryEngine {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridScoredChunk {
    pub chunk: Chunk,
    pub rrf_score: f32,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridSearchResponse {
    pub results: Vec<HybridScoredChunk>,
    pub fallback_used: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefinitionResult {
    pub chunk: Chunk,
    pub is_reexport: bool,
    pub reexport_source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    Calls,
    Imports,
    References,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageResult {
    pub chunk: Chunk,
    pub usage_type: UsageType,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ImportTree {
    pub file: String,
    pub direct_imports: Vec<String>,
    pub direct_importers: Vec<String>,
    pub indirect_imports: Vec<String>,
    pub indirect_importers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleType {
    Direct,
    Indirect,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub cycle_type: CycleType,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubFile {
    pub file: String,
    pub in_degree: usize,
    pub sample_importers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Callers,
    Callees,
    Both,
}

impl CallDirection {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        match raw {
            "callers" => Ok(CallDirection::Callers),
            "callees" => Ok(CallDirection::Callees),
            "both" => Ok(CallDirection::Both),
            other => Err(QueryError::InputInvalid(format!("unsupported direction: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallGraphNode {
    pub chunk_id: Uuid,
    pub file_path: String,
    pub symbol_name: Option<String>,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallGraphEdge {
    pub source_chunk_id: Uuid,
    pub target_chunk_id: Uuid,
    pub callee_name: String,
    pub line: Option<i64>,
    pub receiver: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallGraphResult {
    pub nodes: Vec<CallGraphNode>,
    pub edges: Vec<CallGraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityViolation {
    pub kind: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct IntegrityReport {
    pub violations: Vec<IntegrityViolation>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn Embedder>) -> Self {
        QueryEngine { store, embedder }
    }

    pub async fn semantic_search(
        &self,
        query: &str,
        repo_url: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InputInvalid("query must not be empty".into()));
        }
        let repo_id = repo_url.map(model::repo_id);
        let native = self.embedder.embed_one(query).map_err(|e| QueryError::Embed(e.to_string()))?;
        let padded = model::pad_embedding(&native);
        let rows = self.store.semantic_search(&padded, repo_id.as_deref(), branch, limit.max(1)).await?;
        Ok(rows.into_iter().map(|(chunk, score)| ScoredChunk { chunk, score }).collect())
    }

    pub async fn keyword_search(
        &self,
        query: &str,
        repo_url: Option<&str>,
        branch: Option<&str>,
        limit: usize,
        exact_match_boost: f32,
    ) -> Result<Vec<ScoredChunk>, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InputInvalid("query must not be empty".into()));
        }
        let repo_id = repo_url.map(model::repo_id);
        let bm25_query = bm25::build(query);
        if bm25_query.expression.is_empty() {
            return Ok(Vec::new());
        }
        let boost = if exact_match_boost > 0.0 { exact_match_boost } else { bm25::DEFAULT_EXACT_MATCH_BOOST };
        let rows = self.store.keyword_search(&bm25_query.expression, repo_id.as_deref(), branch, limit.max(1)).await?;
        let mut scored: Vec<ScoredChunk> = rows
            .into_iter()
            .map(|(chunk, score)| {
                let boosted = bm25::apply_exact_match_boost(score, query, &bm25_query, &chunk.symbol_names, boost);
                ScoredChunk { chunk, score: boosted }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    pub async fn hybrid_search(
        &self,
        query: &str,
        weights: Option<hybrid::HybridWeights>,
        limit: usize,
        exact_match_boost: f32,
        repo_url: Option<&str>,
        branch: Option<&str>,
    ) -> Result<HybridSearchResponse, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InputInvalid("query must not be empty".into()));
        }
        let repo_id = repo_url.map(model::repo_id);
        let extracted = hybrid::extract_phrases(query);
        let fetch_limit = limit.max(1) * 2;

        let native = self.embedder.embed_one(&extracted.vector_query).map_err(|e| QueryError::Embed(e.to_string()))?;
        let padded = model::pad_embedding(&native);
        let vector_rows = self.store.semantic_search(&padded, repo_id.as_deref(), branch, fetch_limit).await?;

        let bm25_query = bm25::build(&extracted.keyword_query);
        let keyword_rows = if bm25_query.expression.is_empty() {
            Vec::new()
        } else {
            self.store.keyword_search(&bm25_query.expression, repo_id.as_deref(), branch, fetch_limit).await?
        };

        let mut by_id: HashMap<Uuid, Chunk> = HashMap::new();
        let vector_ids: Vec<Uuid> = vector_rows
            .into_iter()
            .map(|(chunk, _)| {
                let id = chunk.id;
                by_id.insert(id, chunk);
                id
            })
            .collect();
        let keyword_ids: Vec<Uuid> = keyword_rows
            .into_iter()
            .map(|(chunk, _)| {
                let id = chunk.id;
                by_id.entry(id).or_insert(chunk);
                id
            })
            .collect();

        let weights = weights.unwrap_or(hybrid::DEFAULT_WEIGHTS);
        let (fused, fallback_used) = hybrid::fuse(&vector_ids, &keyword_ids, weights, limit.max(1), true);

        let boost = if exact_match_boost > 0.0 { exact_match_boost } else { bm25::DEFAULT_EXACT_MATCH_BOOST };
        let results = fused
            .into_iter()
            .filter_map(|r| {
                by_id.get(&r.chunk_id).cloned().map(|chunk| {
                    let rrf_score = bm25::apply_exact_match_boost(r.rrf_score, query, &bm25_query, &chunk.symbol_names, boost);
                    HybridScoredChunk { chunk, rrf_score, vector_rank: r.vector_rank, keyword_rank: r.keyword_rank }
                })
            })
            .collect();

        Ok(HybridSearchResponse { results, fallback_used })
    }

    pub async fn definitions(
        &self,
        symbol: &str,
        repo_url: Option<&str>,
        branch: Option<&str>,
        include_reexports: bool,
        limit: usize,
    ) -> Result<Vec<DefinitionResult>, QueryError> {
        if symbol.trim().is_empty() {
            return Err(QueryError::InputInvalid("symbol must not be empty".into()));
        }
        let repo_id = repo_url.map(model::repo_id);
        let direct = self.store.definitions(symbol, repo_id.as_deref(), branch).await?;
        let mut results: Vec<DefinitionResult> =
            direct.iter().cloned().map(|chunk| DefinitionResult { chunk, is_reexport: false, reexport_source: None }).collect();

        if include_reexports {
            if let (Some(repo_id), Some(branch)) = (repo_id.as_deref(), branch) {
                let direct_ids: HashSet<Uuid> = direct.iter().map(|c| c.id).collect();
                let all_chunks = self.store.chunks_for_repo(repo_id, branch).await?;
                for candidate in &all_chunks {
                    if direct_ids.contains(&candidate.id) || !candidate.exports.iter().any(|e| e == symbol) {
                        continue;
                    }
                    let outgoing = self.store.relationships_from(candidate.id).await?;
                    let reexport_edge = outgoing.iter().find(|r| {
                        matches!(r.relationship_type, RelationshipType::Imports | RelationshipType::References)
                            && direct_ids.contains(&r.target_chunk_id)
                    });
                    if let Some(edge) = reexport_edge {
                        let source_file = direct.iter().find(|c| c.id == edge.target_chunk_id).map(|c| c.file_path.clone());
                        results.push(DefinitionResult {
                            chunk: candidate.clone(),
                            is_reexport: true,
                            reexport_source: source_file,
                        });
                    }
                }
            }
        }

        results.truncate(limit.max(1));
        Ok(results)
    }

    pub async fn usages(
        &self,
        symbol: &str,
        repo_url: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<UsageResult>, QueryError> {
        if symbol.trim().is_empty() {
            return Err(QueryError::InputInvalid("symbol must not be empty".into()));
        }
        let repo_id = repo_url.map(model::repo_id);
        let defining = self.store.definitions(symbol, repo_id.as_deref(), branch).await?;

        let mut results = Vec::new();
        let mut seen = HashSet::new();
        for target in &defining {
            for edge in self.store.relationships_to(target.id).await? {
                if !seen.insert(edge.source_chunk_id) {
                    continue;
                }
                let Some(source) = self.store.chunk_by_id(edge.source_chunk_id).await? else { continue };
                let usage_type = match edge.relationship_type {
                    RelationshipType::Calls => UsageType::Calls,
                    RelationshipType::Imports => UsageType::Imports,
                    RelationshipType::References => UsageType::References,
                };
                let is_dynamic = edge.metadata.get("is_dynamic").and_then(|v| v.as_bool()).unwrap_or(false);
                results.push(UsageResult { chunk: source, usage_type, is_dynamic });
            }
        }
        results.truncate(limit.max(1));
        Ok(results)
    }

    pub async fn import_tree(&self, file_path: &str, repo_url: &str, branch: &str) -> Result<ImportTree, QueryError> {
        if file_path.trim().is_empty() {
            return Err(QueryError::InputInvalid("file_path must not be empty".into()));
        }
        let repo_id = model::repo_id(repo_url);
        let edges = self.store.all_file_imports(&repo_id, branch).await?;

        let direct_imports =
            dedup_preserve_order(edges.iter().filter(|e| e.source_file == file_path).map(|e| e.target_file.clone()));
        let direct_importers =
            dedup_preserve_order(edges.iter().filter(|e| e.target_file == file_path).map(|e| e.source_file.clone()));
        let direct_set: HashSet<&str> =
            direct_imports.iter().map(String::as_str).chain(direct_importers.iter().map(String::as_str)).collect();

        let mut indirect_imports = Vec::new();
        for f in &direct_imports {
            for e in edges.iter().filter(|e| &e.source_file == f) {
                if e.target_file != file_path && !direct_set.contains(e.target_file.as_str()) {
                    indirect_imports.push(e.target_file.clone());
                }
            }
        }
        let mut indirect_importers = Vec::new();
        for f in &direct_importers {
            for e in edges.iter().filter(|e| &e.target_file == f) {
                if e.source_file != file_path && !direct_set.contains(e.source_file.as_str()) {
                    indirect_importers.push(e.source_file.clone());
                }
            }
        }

        Ok(ImportTree {
            file: file_path.to_string(),
            direct_imports,
            direct_importers,
            indirect_imports: dedup_preserve_order(indirect_imports),
            indirect_importers: dedup_preserve_order(indirect_importers),
        })
    }

    pub async fn circular_dependencies(&self, repo_url: &str, branch: &str, max_cycle_length: usize) -> Result<Vec<Cycle>, QueryError> {
        let repo_id = model::repo_id(repo_url);
        let edges = self.store.all_file_imports(&repo_id, branch).await?;
        let adj = build_adjacency(&edges);
        Ok(find_cycles(&adj, max_cycle_length.max(2)))
    }

    pub async fn hub_files(&self, repo_url: &str, branch: &str, threshold: usize, limit: usize) -> Result<Vec<HubFile>, QueryError> {
        let repo_id = model::repo_id(repo_url);
        let edges = self.store.all_file_imports(&repo_id, branch).await?;

        let mut importers: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &edges {
            importers.entry(edge.target_file.clone()).or_default().push(edge.source_file.clone());
        }

        let mut hubs: Vec<HubFile> = importers
            .into_iter()
            .filter(|(_, v)| v.len() >= threshold.max(1))
            .map(|(file, mut v)| {
                v.sort();
                v.dedup();
                let in_degree = v.len();
                v.truncate(10);
                HubFile { file, in_degree, sample_importers: v }
            })
            .collect();
        hubs.sort_by(|a, b| b.in_degree.cmp(&a.in_degree).then_with(|| a.file.cmp(&b.file)));
        hubs.truncate(limit.max(1));
        Ok(hubs)
    }

    pub async fn call_graph(
        &self,
        function: &str,
        direction: CallDirection,
        depth: u32,
        repo_url: Option<&str>,
        branch: Option<&str>,
        node_limit: usize,
    ) -> Result<CallGraphResult, QueryError> {
        if function.trim().is_empty() {
            return Err(QueryError::InputInvalid("function must not be empty".into()));
        }
        if !(1..=5).contains(&depth) {
            return Err(QueryError::InputInvalid("depth must be between 1 and 5".into()));
        }
        let repo_id = repo_url.map(model::repo_id);
        let seeds = self.store.definitions(function, repo_id.as_deref(), branch).await?;

        let mut nodes: HashMap<Uuid, CallGraphNode> = HashMap::new();
        let mut edges: Vec<CallGraphEdge> = Vec::new();
        let mut edge_seen: HashSet<(Uuid, Uuid)> = HashSet::new();
        let node_limit = node_limit.max(1);

        for seed in &seeds {
            nodes.insert(
                seed.id,
                CallGraphNode { chunk_id: seed.id, file_path: seed.file_path.clone(), symbol_name: seed.symbol_name.clone(), depth: 0 },
            );
        }
        let mut frontier: Vec<Uuid> = seeds.iter().map(|c| c.id).collect();

        for current_depth in 1..=depth {
            if nodes.len() >= node_limit || frontier.is_empty() {
                break;
            }
            let mut next_frontier = Vec::new();
            'frontier: for &node_id in &frontier {
                if matches!(direction, CallDirection::Callees | CallDirection::Both) {
                    for edge in self.store.relationships_from(node_id).await? {
                        if edge.relationship_type != RelationshipType::Calls {
                            continue;
                        }
                        record_call_edge(&edge, node_id, edge.target_chunk_id, &mut edges, &mut edge_seen);
                        if !nodes.contains_key(&edge.target_chunk_id) {
                            if nodes.len() >= node_limit {
                                break 'frontier;
                            }
                            if let Some(target) = self.store.chunk_by_id(edge.target_chunk_id).await? {
                                nodes.insert(
                                    target.id,
                                    CallGraphNode {
                                        chunk_id: target.id,
                                        file_path: target.file_path.clone(),
                                        symbol_name: target.symbol_name.clone(),
                                        depth: current_depth,
                                    },
                                );
                                next_frontier.push(target.id);
                            }
                        }
                    }
                }
                if matches!(direction, CallDirection::Callers | CallDirection::Both) {
                    for edge in self.store.relationships_to(node_id).await? {
                        if edge.relationship_type != RelationshipType::Calls {
                            continue;
                        }
                        record_call_edge(&edge, edge.source_chunk_id, node_id, &mut edges, &mut edge_seen);
                        if !nodes.contains_key(&edge.source_chunk_id) {
                            if nodes.len() >= node_limit {
                                break 'frontier;
                            }
                            if let Some(source) = self.store.chunk_by_id(edge.source_chunk_id).await? {
                                nodes.insert(
                                    source.id,
                                    CallGraphNode {
                                        chunk_id: source.id,
                                        file_path: source.file_path.clone(),
                                        symbol_name: source.symbol_name.clone(),
                                        depth: current_depth,
                                    },
                                );
                                next_frontier.push(source.id);
                            }
                        }
                    }
                }
            }
            frontier = next_frontier;
        }

        let mut node_list: Vec<CallGraphNode> = nodes.into_values().collect();
        node_list.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
        Ok(CallGraphResult { nodes: node_list, edges })
    }

    pub async fn stats(&self, repo_url: Option<&str>, branch: Option<&str>) -> Result<StatsSummary, QueryError> {
        let repo_id = repo_url.map(model::repo_id);
        Ok(self.store.stats(repo_id.as_deref(), branch).await?)
    }

    pub async fn list_repos(&self) -> Result<Vec<RepoSummary>, QueryError> {
        Ok(self.store.list_repos().await?)
    }

    pub async fn delete_repo(&self, repo_url: &str) -> Result<i64, QueryError> {
        Ok(self.store.delete_repo(repo_url).await?)
    }

    /// B.4 — checks the §8 universal invariants over a stored repo/branch:
    /// line coverage via non-overlap, content-hash correctness, embedding
    /// dimension, and dangling relationship endpoints.
    pub async fn verify_integrity(&self, repo_url: &str, branch: &str) -> Result<IntegrityReport, QueryError> {
        let repo_id = model::repo_id(repo_url);
        let chunks = self.store.chunks_for_repo(&repo_id, branch).await?;
        let mut violations = Vec::new();

        let mut by_file: HashMap<&str, Vec<(u32, u32)>> = HashMap::new();
        for chunk in &chunks {
            by_file.entry(chunk.file_path.as_str()).or_default().push((chunk.line_start, chunk.line_end));
        }
        for (file, mut ranges) in by_file {
            ranges.sort();
            for pair in ranges.windows(2) {
                if pair[0].1 >= pair[1].0 {
                    violations.push(IntegrityViolation {
                        kind: "overlap".into(),
                        detail: format!("{file}: [{}-{}] overlaps [{}-{}]", pair[0].0, pair[0].1, pair[1].0, pair[1].1),
                    });
                }
            }
        }

        for chunk in &chunks {
            if model::content_hash(&chunk.content) != chunk.content_hash {
                violations.push(IntegrityViolation {
                    kind: "content_hash_mismatch".into(),
                    detail: format!("{} [{}:{}]", chunk.file_path, chunk.line_start, chunk.line_end),
                });
            }
            if chunk.embedding.len() != model::D_PAD {
                violations.push(IntegrityViolation {
                    kind: "embedding_dim".into(),
                    detail: format!("{} [{}:{}] has {} dims, expected {}", chunk.file_path, chunk.line_start, chunk.line_end, chunk.embedding.len(), model::D_PAD),
                });
            }
        }

        let chunk_ids: HashSet<Uuid> = chunks.iter().map(|c| c.id).collect();
        for chunk in &chunks {
            for edge in self.store.relationships_from(chunk.id).await? {
                if !chunk_ids.contains(&edge.target_chunk_id) {
                    violations.push(IntegrityViolation {
                        kind: "dangling_relationship".into(),
                        detail: format!("{} -> missing chunk {}", chunk.id, edge.target_chunk_id),
                    });
                }
            }
        }

        Ok(IntegrityReport { violations })
    }
}

fn record_call_edge(
    edge: &crate::model::Relationship,
    source: Uuid,
    target: Uuid,
    edges: &mut Vec<CallGraphEdge>,
    seen: &mut HashSet<(Uuid, Uuid)>,
) {
    if source == target || !seen.insert((source, target)) {
        return;
    }
    let callee_name = edge.metadata.get("callee_name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let line = edge.metadata.get("line").and_then(|v| v.as_i64());
    let receiver = edge.metadata.get("receiver").and_then(|v| v.as_str()).map(str::to_string);
    edges.push(CallGraphEdge { source_chunk_id: source, target_chunk_id: target, callee_name, line, receiver });
}

fn build_adjacency(edges: &[crate::model::FileImport]) -> HashMap<String, Vec<String>> {
    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    for edge in edges {
        adj.entry(edge.source_file.clone()).or_default().push(edge.target_file.clone());
    }
    for targets in adj.values_mut() {
        targets.sort();
        targets.dedup();
    }
    adj
}

/// Iterative DFS with an explicit recursion stack (no recursion, so depth is
/// bounded only by heap, matching the "iterative DFS with a recursion stack"
/// requirement). A back-edge to a node still on the path records a cycle,
/// canonicalized by its sorted node set for dedup.
fn find_cycles(adj: &HashMap<String, Vec<String>>, max_len: usize) -> Vec<Cycle> {
    let mut all_nodes: Vec<String> = adj.keys().cloned().collect();
    all_nodes.sort();
    let empty: Vec<String> = Vec::new();

    let mut seen_canonical: HashSet<Vec<String>> = HashSet::new();
    let mut results = Vec::new();
    let mut globally_done: HashSet<String> = HashSet::new();

    for start in &all_nodes {
        if globally_done.contains(start) {
            continue;
        }
        let mut path: Vec<String> = vec![start.clone()];
        let mut on_stack: HashMap<String, usize> = HashMap::new();
        on_stack.insert(start.clone(), 0);
        let mut frame_idx: Vec<usize> = vec![0];

        loop {
            let current = path.last().unwrap().clone();
            let current_depth = path.len() - 1;
            let children = adj.get(&current).unwrap_or(&empty);
            let idx = *frame_idx.last().unwrap();

            if idx >= children.len() {
                on_stack.remove(&current);
                globally_done.insert(current);
                path.pop();
                frame_idx.pop();
                if path.is_empty() {
                    break;
                }
                continue;
            }

            *frame_idx.last_mut().unwrap() += 1;
            let child = children[idx].clone();

            if let Some(&child_depth) = on_stack.get(&child) {
                let cycle_len = current_depth - child_depth + 1;
                if cycle_len <= max_len {
                    let mut nodes: Vec<String> = path[child_depth..].to_vec();
                    nodes.sort();
                    if seen_canonical.insert(nodes.clone()) {
                        let cycle_type = if nodes.len() == 2 { CycleType::Direct } else { CycleType::Indirect };
                        results.push(Cycle { nodes, cycle_type });
                    }
                }
                continue;
            }
            if globally_done.contains(&child) {
                continue;
            }
            path.push(child.clone());
            on_stack.insert(child, path.len() - 1);
            frame_idx.push(0);
        }
    }
    results
}

fn dedup_preserve_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileImport;

    fn import(src: &str, dst: &str) -> FileImport {
        FileImport {
            source_file: src.into(),
            target_file: dst.into(),
            repo_id: "r".into(),
            branch: "main".into(),
            import_type: crate::model::ImportType::Static,
            imported_symbols: Vec::new(),
        }
    }

    #[test]
    fn call_direction_parses_known_values() {
        assert_eq!(CallDirection::parse("callers").unwrap(), CallDirection::Callers);
        assert!(CallDirection::parse("sideways").is_err());
    }

    #[test]
    fn finds_indirect_three_node_cycle() {
        let edges = vec![import("a.ts", "b.ts"), import("b.ts", "c.ts"), import("c.ts", "a.ts")];
        let adj = build_adjacency(&edges);
        let cycles = find_cycles(&adj, 10);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_type, CycleType::Indirect);
        let mut nodes = cycles[0].nodes.clone();
        nodes.sort();
        assert_eq!(nodes, vec!["a.ts".to_string(), "b.ts".to_string(), "c.ts".to_string()]);
    }

    #[test]
    fn adding_mutual_edge_adds_direct_cycle() {
        let edges =
            vec![import("a.ts", "b.ts"), import("b.ts", "c.ts"), import("c.ts", "a.ts"), import("b.ts", "a.ts")];
        let adj = build_adjacency(&edges);
        let cycles = find_cycles(&adj, 10);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().any(|c| c.cycle_type == CycleType::Direct && c.nodes.len() == 2));
        assert!(cycles.iter().any(|c| c.cycle_type == CycleType::Indirect && c.nodes.len() == 3));
    }

    #[test]
    fn dedup_preserve_order_keeps_first_occurrence() {
        let out = dedup_preserve_order(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
    }
}
