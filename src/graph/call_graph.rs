//! C8 — Call-graph builder.
//!
//! Builds a `name -> [chunk_ids]` symbol index from every chunk's
//! `symbol_names`, re-runs the call extractor (C5) per chunk, and resolves
//! each non-built-in call in priority order: self/this receiver within the
//! same file, then a capitalized/bare receiver co-occurring with the callee
//! in one chunk's symbol list, then first-same-file-then-anywhere by bare
//! callee name. Dynamic, anonymous, and unresolved calls are dropped.

use crate::extract::calls::{self, CallSite};
use crate::language;
use crate::model::{Chunk, Relationship, RelationshipType};
use std::collections::{HashMap, HashSet};
use tree_sitter::Parser;
use uuid::Uuid;

/// Language built-ins the graph never tries to resolve to a chunk. Not
/// exhaustive — a representative set per the kinds of calls that show up in
/// every repo (console/print, primitive constructors, stdlib math).
const BUILTIN_RECEIVERS: &[&str] = &["console", "Math", "JSON", "Object", "Array", "std"];
const BUILTIN_BARE_CALLEES: &[&str] =
    &["print", "len", "str", "int", "float", "range", "list", "dict", "set", "println!", "format!", "vec!"];

pub fn build(chunks: &[Chunk]) -> Vec<Relationship> {
    let symbol_index = build_symbol_index(chunks);
    let mut out = Vec::new();
    let mut seen: HashSet<(Uuid, Uuid, String)> = HashSet::new();

    for source in chunks {
        let Some(lang) = &source.language else { continue };
        let Some(spec) = language::spec_by_id(lang) else { continue };
        let mut parser = Parser::new();
        if parser.set_language(&(spec.grammar)()).is_err() {
            continue;
        }
        let Some(tree) = parser.parse(&source.content, None) else { continue };
        let sites = calls::extract(tree.root_node(), spec, source.content.as_bytes());

        for site in &sites {
            if site.is_dynamic || is_builtin(site) {
                continue;
            }
            let Some(target) = resolve(source, site, &symbol_index, spec, chunks) else { continue };
            if target == source.id {
                continue;
            }
            let key = (source.id, target, site.callee_name.clone());
            if seen.insert(key) {
                let mut metadata = serde_json::json!({ "callee_name": site.callee_name, "line": site.line });
                if let Some(receiver) = &site.receiver {
                    metadata["receiver"] = serde_json::Value::String(receiver.clone());
                }
                out.push(Relationship {
                    source_chunk_id: source.id,
                    target_chunk_id: target,
                    relationship_type: RelationshipType::Calls,
                    metadata,
                });
            }
        }
    }
    out
}

fn build_symbol_index(chunks: &[Chunk]) -> HashMap<String, Vec<Uuid>> {
    let mut index: HashMap<String, Vec<Uuid>> = HashMap::new();
    for chunk in chunks {
        for name in &chunk.symbol_names {
            index.entry(name.clone()).or_default().push(chunk.id);
        }
    }
    index
}

fn is_builtin(site: &CallSite) -> bool {
    if let Some(receiver) = &site.receiver {
        if BUILTIN_RECEIVERS.contains(&receiver.as_str()) {
            return true;
        }
    }
    BUILTIN_BARE_CALLEES.contains(&site.callee_name.as_str())
}

fn resolve(
    source: &Chunk,
    site: &CallSite,
    symbol_index: &HashMap<String, Vec<Uuid>>,
    spec: &language::LanguageSpec,
    chunks: &[Chunk],
) -> Option<Uuid> {
    let by_id: HashMap<Uuid, &Chunk> = chunks.iter().map(|c| (c.id, c)).collect();

    if let Some(receiver) = &site.receiver {
        if spec.self_keywords.contains(&receiver.as_str()) {
            if let Some(candidates) = symbol_index.get(&site.callee_name) {
                return pick_same_file_first(candidates, source, &by_id);
            }
            return None;
        }

        let is_capitalized_or_identifier = receiver.chars().next().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false);
        if is_capitalized_or_identifier {
            let candidates = chunks
                .iter()
                .filter(|c| c.symbol_names.contains(receiver) && c.symbol_names.contains(&site.callee_name))
                .map(|c| c.id)
                .collect::<Vec<_>>();
            if !candidates.is_empty() {
                return pick_same_file_first(&candidates, source, &by_id);
            }
        }
    }

    let candidates = symbol_index.get(&site.callee_name)?;
    pick_same_file_first(candidates, source, &by_id)
}

fn pick_same_file_first(candidates: &[Uuid], source: &Chunk, by_id: &HashMap<Uuid, &Chunk>) -> Option<Uuid> {
    if candidates.is_empty() {
        return None;
    }
    let mut same_file: Vec<Uuid> = candidates
        .iter()
        .copied()
        .filter(|id| by_id.get(id).map(|c| c.file_path == source.file_path).unwrap_or(false))
        .collect();
    same_file.sort();
    if let Some(first) = same_file.first() {
        return Some(*first);
    }
    let mut rest = candidates.to_vec();
    rest.sort();
    rest.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{chunk_id, ChunkType};

    fn chunk(path: &str, content: &str, symbol_names: Vec<&str>) -> Chunk {
        Chunk {
            id: chunk_id("r", "main", path, 1, 10),
            file_path: path.to_string(),
            repo_id: "r".into(),
            branch: "main".into(),
            language: Some("rust".into()),
            chunk_type: ChunkType::Function,
            symbol_name: symbol_names.first().map(|s| s.to_string()),
            symbol_names: symbol_names.into_iter().map(|s| s.to_string()).collect(),
            imports: Vec::new(),
            exports: Vec::new(),
            line_start: 1,
            line_end: 10,
            content: content.to_string(),
            content_hash: crate::model::content_hash(content),
            embedding: Vec::new(),
            full_text_index: content.to_string(),
        }
    }

    #[test]
    fn resolves_same_file_plain_call() {
        let a = chunk("lib.rs", "fn caller() { callee(); }", vec!["caller"]);
        let b = chunk("lib.rs", "fn callee() {}", vec!["callee"]);
        let edges = build(&[a, b]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relationship_type, RelationshipType::Calls);
    }

    #[test]
    fn builtin_calls_are_dropped() {
        let a = chunk("lib.rs", "fn caller() { println!(\"hi\"); }", vec!["caller"]);
        let edges = build(&[a]);
        assert!(edges.is_empty());
    }

    #[test]
    fn self_edges_are_dropped() {
        let a = chunk("lib.rs", "fn recurse() { recurse(); }", vec!["recurse"]);
        let edges = build(&[a]);
        assert!(edges.is_empty());
    }
}
