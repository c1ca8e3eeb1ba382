//! C7 — Relationship builder.
//!
//! Two inferences over the chunks already materialized for a repo/branch:
//! `imports` edges from symbol/export matching, and `references` edges from
//! plain-text occurrence scanning. Both dedup by `(source, target, type)`.

use crate::model::{Chunk, Relationship, RelationshipType};
use regex::Regex;
use std::collections::HashSet;
use uuid::Uuid;

const MIN_REFERENCE_SYMBOL_LEN: usize = 3;

pub fn build(chunks: &[Chunk]) -> Vec<Relationship> {
    let mut out = Vec::new();
    let mut seen: HashSet<(Uuid, Uuid, &'static str)> = HashSet::new();

    for importing in chunks {
        for symbol in &importing.imports {
            for defining in chunks {
                if defining.id == importing.id {
                    continue;
                }
                if defining.exports.iter().any(|e| e == symbol) {
                    let key = (importing.id, defining.id, "imports");
                    if seen.insert(key) {
                        out.push(Relationship {
                            source_chunk_id: importing.id,
                            target_chunk_id: defining.id,
                            relationship_type: RelationshipType::Imports,
                            metadata: serde_json::json!({ "imported_symbol": symbol }),
                        });
                    }
                }
            }
        }
    }

    for defining in chunks {
        for symbol in &defining.symbol_names {
            if symbol.len() < MIN_REFERENCE_SYMBOL_LEN {
                continue;
            }
            let pattern = match word_boundary_pattern(symbol) {
                Some(p) => p,
                None => continue,
            };
            for using in chunks {
                if using.id == defining.id {
                    continue;
                }
                let key = (using.id, defining.id, "imports");
                if seen.contains(&key) {
                    continue;
                }
                if pattern.is_match(&using.content) {
                    let ref_key = (using.id, defining.id, "references");
                    if seen.insert(ref_key) {
                        out.push(Relationship {
                            source_chunk_id: using.id,
                            target_chunk_id: defining.id,
                            relationship_type: RelationshipType::References,
                            metadata: serde_json::json!({ "symbol": symbol }),
                        });
                    }
                }
            }
        }
    }

    out
}

/// `symbol` followed by `(`, `.`, or whitespace, at a word boundary.
fn word_boundary_pattern(symbol: &str) -> Option<Regex> {
    let escaped = regex::escape(symbol);
    Regex::new(&format!(r"\b{escaped}\b[\(\.\s]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{chunk_id, ChunkType};

    fn chunk(id_seed: u32, content: &str, exports: Vec<&str>, imports: Vec<&str>, symbol_names: Vec<&str>) -> Chunk {
        Chunk {
            id: chunk_id("r", "main", &format!("f{id_seed}.ts"), 1, 10),
            file_path: format!("f{id_seed}.ts"),
            repo_id: "r".into(),
            branch: "main".into(),
            language: Some("typescript".into()),
            chunk_type: ChunkType::Function,
            symbol_name: symbol_names.first().map(|s| s.to_string()),
            symbol_names: symbol_names.into_iter().map(|s| s.to_string()).collect(),
            imports: imports.into_iter().map(|s| s.to_string()).collect(),
            exports: exports.into_iter().map(|s| s.to_string()).collect(),
            line_start: 1,
            line_end: 10,
            content: content.to_string(),
            content_hash: crate::model::content_hash(content),
            embedding: Vec::new(),
            full_text_index: content.to_string(),
        }
    }

    #[test]
    fn import_edge_requires_matching_export() {
        let a = chunk(1, "import b", vec![], vec!["./b"], vec!["runA"]);
        let b = chunk(2, "export const runB", vec!["./b"], vec![], vec!["runB"]);
        let edges = build(&[a, b]);
        assert!(edges.iter().any(|e| e.relationship_type == RelationshipType::Imports));
    }

    #[test]
    fn reference_requires_word_boundary_and_call_like_suffix() {
        let def = chunk(1, "function helper() {}", vec![], vec![], vec!["helper"]);
        let user = chunk(2, "helper(1, 2);", vec![], vec![], vec!["caller"]);
        let edges = build(&[def, user]);
        assert!(edges.iter().any(|e| e.relationship_type == RelationshipType::References));
    }

    #[test]
    fn short_symbols_are_ignored() {
        let def = chunk(1, "function go() {}", vec![], vec![], vec!["go"]);
        let user = chunk(2, "go()", vec![], vec![], vec!["caller"]);
        let edges = build(&[def, user]);
        assert!(edges.is_empty());
    }
}
