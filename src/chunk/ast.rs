//! C2 — AST chunker.
//!
//! Walks a parsed tree top-down, emitting one chunk per outer semantic unit
//! (function/class/method/interface), absorbing leading comments, splitting
//! off large nested units, gap-filling module-level regions between units,
//! and falling back to fixed-window line chunking when there's no tree to
//! walk or nothing in it qualifies as a unit.
//!
//! `imports`/`exports`/`symbol_names` beyond a unit's own declared name are
//! left for `extract::symbols` (C4) to backfill — this module only knows
//! about tree shape, not cross-file resolution.

use super::ChunkerConfig;
use crate::language::{self, LanguageSpec};
use crate::model::{Chunk, ChunkType};
use std::path::Path;
use tree_sitter::{Node, Parser};

pub fn chunk(path: &Path, content: &str, repo_id: &str, branch: &str, file_path: &str, cfg: ChunkerConfig) -> Vec<Chunk> {
    let total_lines = content.lines().count() as u32;
    if total_lines == 0 {
        return Vec::new();
    }

    let spec = match language::spec_for_path(path) {
        Some(spec) => spec,
        None => return fallback_chunk(content, repo_id, branch, file_path, cfg, None),
    };

    let mut parser = Parser::new();
    if parser.set_language(&(spec.grammar)()).is_err() {
        return fallback_chunk(content, repo_id, branch, file_path, cfg, Some(spec));
    }
    let tree = match parser.parse(content, None) {
        Some(tree) => tree,
        None => return fallback_chunk(content, repo_id, branch, file_path, cfg, Some(spec)),
    };

    let mut units: Vec<UnitNode> = Vec::new();
    collect_top_level(tree.root_node(), spec, &mut units);

    if units.is_empty() {
        let symbol_names = collect_module_symbol_names(tree.root_node(), spec, content.as_bytes());
        return vec![module_chunk(content, repo_id, branch, file_path, spec, total_lines, symbol_names)];
    }

    let bytes = content.as_bytes();
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut covered: Vec<(u32, u32)> = Vec::new();

    for unit in &units {
        let chunk = build_chunk(unit, bytes, content, repo_id, branch, file_path, spec);
        covered.push((chunk.line_start, chunk.line_end));
        chunks.push(chunk);

        let mut nested = Vec::new();
        collect_nested(unit.node, spec, cfg.nested_threshold, &mut nested);
        for n in &nested {
            chunks.push(build_chunk(n, bytes, content, repo_id, branch, file_path, spec));
        }
    }

    for (start, end) in gap_ranges(&covered, total_lines, content) {
        chunks.push(Chunk {
            id: crate::model::chunk_id(repo_id, branch, file_path, start, end),
            file_path: file_path.to_string(),
            repo_id: repo_id.to_string(),
            branch: branch.to_string(),
            language: Some(spec.id.to_string()),
            chunk_type: ChunkType::Other,
            symbol_name: None,
            symbol_names: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            line_start: start,
            line_end: end,
            content: lines_slice(content, start, end),
            content_hash: crate::model::content_hash(&lines_slice(content, start, end)),
            embedding: Vec::new(),
            full_text_index: lines_slice(content, start, end),
        });
    }

    chunks.sort_by_key(|c| c.line_start);
    chunks
}

struct UnitNode<'a> {
    node: Node<'a>,
}

fn is_class_like(kind: &str, spec: &LanguageSpec) -> bool {
    spec.class_kinds.contains(&kind) || spec.interface_kinds.contains(&kind)
}

fn is_semantic_kind(kind: &str, spec: &LanguageSpec) -> bool {
    spec.function_kinds.contains(&kind) || spec.method_kinds.contains(&kind) || is_class_like(kind, spec)
}

/// A method kind only qualifies when it sits inside a class-like aggregate;
/// walk up through body/list wrapper nodes to find that ancestor without
/// crossing into an enclosing function first.
fn enclosing_class_like<'a>(node: Node<'a>, spec: &LanguageSpec) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        let kind = n.kind();
        if is_class_like(kind, spec) {
            return true;
        }
        if spec.function_kinds.contains(&kind) {
            return false;
        }
        cur = n.parent();
    }
    false
}

fn qualifies(node: Node, spec: &LanguageSpec) -> bool {
    let kind = node.kind();
    if spec.method_kinds.contains(&kind) {
        return enclosing_class_like(node, spec);
    }
    is_semantic_kind(kind, spec) && !spec.method_kinds.contains(&kind)
}

fn collect_top_level<'a>(node: Node<'a>, spec: &LanguageSpec, out: &mut Vec<UnitNode<'a>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if qualifies(child, spec) {
            out.push(UnitNode { node: child });
            // outer nodes are picked before recursing: do not look for more
            // top-level units inside this one.
        } else {
            collect_top_level(child, spec, out);
        }
    }
}

/// Inside an already-selected unit, find qualifying descendants (nested
/// functions/classes) that weren't chosen at the top level because they sit
/// inside it. Each becomes an additional chunk only if its line count meets
/// `threshold`; below that it stays inlined in the parent's text only.
fn collect_nested<'a>(node: Node<'a>, spec: &LanguageSpec, threshold: u32, out: &mut Vec<UnitNode<'a>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if qualifies(child, spec) {
            let lines = (child.end_position().row - child.start_position().row) as u32 + 1;
            if lines >= threshold {
                out.push(UnitNode { node: child });
            }
            collect_nested(child, spec, threshold, out);
        } else {
            collect_nested(child, spec, threshold, out);
        }
    }
}

fn declared_name(node: Node, spec: &LanguageSpec, source: &[u8]) -> Option<String> {
    if spec.uses_declarator_name {
        return c_like_declared_name(node, source);
    }
    node.child_by_field_name(spec.name_field)
        .and_then(|n| n.utf8_text(source).ok().map(|s| s.to_string()))
}

/// C/C++: the identifier sits at the bottom of a `declarator` chain
/// (`function_declarator` -> `identifier`, possibly behind `pointer_declarator`).
fn c_like_declared_name(node: Node, source: &[u8]) -> Option<String> {
    let mut cur = node.child_by_field_name("declarator")?;
    loop {
        if cur.kind() == "identifier" || cur.kind() == "field_identifier" {
            return cur.utf8_text(source).ok().map(|s| s.to_string());
        }
        cur = cur.child_by_field_name("declarator")?;
    }
}

/// Direct method names for a class-like unit: scan its subtree but don't
/// descend past another class-like or function-like boundary.
fn direct_method_names(node: Node, spec: &LanguageSpec, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if kind == node.kind() {
            continue;
        }
        if spec.method_kinds.contains(&kind) {
            if let Some(name) = declared_name(child, spec, source) {
                out.push(name);
            }
            continue;
        }
        if is_class_like(kind, spec) || spec.function_kinds.contains(&kind) {
            continue;
        }
        out.extend(direct_method_names(child, spec, source));
    }
    out
}

/// Walk backwards through preceding siblings absorbing comment nodes that
/// sit within one blank line of the accumulated start, returning the
/// earliest absorbed byte offset (or the unit's own start byte).
fn absorb_leading_comments(node: Node, spec: &LanguageSpec, content: &str) -> usize {
    let mut start_byte = node.start_byte();
    let mut start_row = node.start_position().row;
    let mut cur = node.prev_sibling();
    while let Some(sib) = cur {
        let kind = sib.kind();
        let is_comment =
            spec.line_comment_kinds.contains(&kind) || spec.block_comment_kinds.contains(&kind);
        if !is_comment {
            break;
        }
        let sib_end_row = sib.end_position().row;
        let blank_lines_between = start_row.saturating_sub(sib_end_row + 1);
        if blank_lines_between > 1 {
            break;
        }
        start_byte = sib.start_byte();
        start_row = sib.start_position().row;
        cur = sib.prev_sibling();
    }
    let _ = content;
    start_byte
}

fn chunk_type_for(kind: &str, spec: &LanguageSpec) -> ChunkType {
    if spec.interface_kinds.contains(&kind) {
        ChunkType::Interface
    } else if spec.method_kinds.contains(&kind) {
        ChunkType::Method
    } else if spec.class_kinds.contains(&kind) {
        ChunkType::Class
    } else {
        ChunkType::Function
    }
}

fn build_chunk(
    unit: &UnitNode,
    bytes: &[u8],
    content: &str,
    repo_id: &str,
    branch: &str,
    file_path: &str,
    spec: &LanguageSpec,
) -> Chunk {
    let node = unit.node;
    let start_byte = absorb_leading_comments(node, spec, content);
    let end_byte = node.end_byte();
    let text = String::from_utf8_lossy(&bytes[start_byte..end_byte]).to_string();

    let line_start = byte_to_line(content, start_byte);
    let line_end = node.end_position().row as u32 + 1;

    let own_name = declared_name(node, spec, bytes);
    let chunk_type = chunk_type_for(node.kind(), spec);

    let mut symbol_names: Vec<String> = Vec::new();
    if let Some(name) = &own_name {
        symbol_names.push(name.clone());
    }
    if matches!(chunk_type, ChunkType::Class | ChunkType::Interface) {
        symbol_names.extend(direct_method_names(node, spec, bytes));
    }

    Chunk {
        id: crate::model::chunk_id(repo_id, branch, file_path, line_start, line_end),
        file_path: file_path.to_string(),
        repo_id: repo_id.to_string(),
        branch: branch.to_string(),
        language: Some(spec.id.to_string()),
        chunk_type,
        symbol_name: own_name,
        symbol_names,
        imports: Vec::new(),
        exports: Vec::new(),
        line_start,
        line_end,
        content: text.clone(),
        content_hash: crate::model::content_hash(&text),
        embedding: Vec::new(),
        full_text_index: text,
    }
}

fn byte_to_line(content: &str, byte_offset: usize) -> u32 {
    content[..byte_offset].bytes().filter(|b| *b == b'\n').count() as u32 + 1
}

fn lines_slice(content: &str, start: u32, end: u32) -> String {
    content
        .lines()
        .skip((start - 1) as usize)
        .take((end - start + 1) as usize)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Non-blank gaps between covered ranges, merged and sorted first.
fn gap_ranges(covered: &[(u32, u32)], total_lines: u32, content: &str) -> Vec<(u32, u32)> {
    let mut ranges = covered.to_vec();
    ranges.sort_by_key(|r| r.0);
    let mut merged: Vec<(u32, u32)> = Vec::new();
    for (s, e) in ranges {
        if let Some(last) = merged.last_mut() {
            if s <= last.1 + 1 {
                last.1 = last.1.max(e);
                continue;
            }
        }
        merged.push((s, e));
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut gaps = Vec::new();
    let mut cursor = 1u32;
    for (s, e) in merged.into_iter().chain(std::iter::once((total_lines + 1, total_lines + 1))) {
        if s > cursor {
            let gap_start = cursor;
            let gap_end = s - 1;
            if has_non_blank(&lines, gap_start, gap_end) {
                gaps.push((gap_start, gap_end));
            }
        }
        cursor = cursor.max(e + 1);
    }
    gaps
}

fn has_non_blank(lines: &[&str], start: u32, end: u32) -> bool {
    lines
        .iter()
        .skip((start.saturating_sub(1)) as usize)
        .take((end - start + 1) as usize)
        .any(|l| !l.trim().is_empty())
}

/// No qualifying function/class/method/interface anywhere in the tree
/// (§4.2 step 7): the module chunk still surfaces whatever names are bound
/// at the top level — assignments and variable declarations — so it stays
/// findable by symbol-name lookups.
fn collect_module_symbol_names(root: Node, spec: &LanguageSpec, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        collect_declared_names(child, spec, source, &mut out);
    }
    out
}

fn collect_declared_names(node: Node, spec: &LanguageSpec, source: &[u8], out: &mut Vec<String>) {
    if let Some(name) = declared_name(node, spec, source) {
        out.push(name);
        return;
    }
    match node.kind() {
        "assignment" | "augmented_assignment" => {
            if let Some(left) = node.child_by_field_name("left") {
                if let Ok(text) = left.utf8_text(source) {
                    out.push(text.to_string());
                }
            }
        }
        "variable_declarator" => {
            if let Some(name) = node.child_by_field_name("name") {
                if let Ok(text) = name.utf8_text(source) {
                    out.push(text.to_string());
                }
            }
        }
        "lexical_declaration" | "variable_declaration" | "const_declaration" | "short_var_declaration" | "var_spec"
        | "expression_statement" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_declared_names(child, spec, source, out);
            }
        }
        _ => {}
    }
}

fn module_chunk(
    content: &str,
    repo_id: &str,
    branch: &str,
    file_path: &str,
    spec: &LanguageSpec,
    total_lines: u32,
    symbol_names: Vec<String>,
) -> Chunk {
    Chunk {
        id: crate::model::chunk_id(repo_id, branch, file_path, 1, total_lines),
        file_path: file_path.to_string(),
        repo_id: repo_id.to_string(),
        branch: branch.to_string(),
        language: Some(spec.id.to_string()),
        chunk_type: ChunkType::Module,
        symbol_name: None,
        symbol_names,
        imports: Vec::new(),
        exports: Vec::new(),
        line_start: 1,
        line_end: total_lines,
        content: content.to_string(),
        content_hash: crate::model::content_hash(content),
        embedding: Vec::new(),
        full_text_index: content.to_string(),
    }
}

/// Fixed-window line chunking used when there's no grammar for this
/// extension, or the parser produced no tree at all.
fn fallback_chunk(
    content: &str,
    repo_id: &str,
    branch: &str,
    file_path: &str,
    cfg: ChunkerConfig,
    spec: Option<&LanguageSpec>,
) -> Vec<Chunk> {
    let total_lines = content.lines().count() as u32;
    if total_lines == 0 {
        return Vec::new();
    }
    let window = cfg.fallback_max_lines.max(1);
    let overlap = cfg.fallback_overlap_lines.min(window.saturating_sub(1));
    let lang = spec.map(|s| s.id.to_string());

    let mut out = Vec::new();
    let mut start = 1u32;
    while start <= total_lines {
        let end = (start + window - 1).min(total_lines);
        let text = lines_slice(content, start, end);
        out.push(Chunk {
            id: crate::model::chunk_id(repo_id, branch, file_path, start, end),
            file_path: file_path.to_string(),
            repo_id: repo_id.to_string(),
            branch: branch.to_string(),
            language: lang.clone(),
            chunk_type: ChunkType::Other,
            symbol_name: None,
            symbol_names: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            line_start: start,
            line_end: end,
            content_hash: crate::model::content_hash(&text),
            content: text.clone(),
            embedding: Vec::new(),
            full_text_index: text,
        });
        if end == total_lines {
            break;
        }
        start = end + 1 - overlap;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkerConfig;

    #[test]
    fn rust_function_becomes_one_chunk() {
        let src = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let chunks = chunk(Path::new("lib.rs"), src, "repo", "main", "lib.rs", ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Function);
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("add"));
    }

    #[test]
    fn rust_leading_comment_is_absorbed() {
        let src = "// doubles the input\nfn double(a: i32) -> i32 {\n    a * 2\n}\n";
        let chunks = chunk(Path::new("lib.rs"), src, "repo", "main", "lib.rs", ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 1);
        assert!(chunks[0].content.starts_with("// doubles"));
    }

    #[test]
    fn impl_block_collects_method_names() {
        let src = "struct Foo;\nimpl Foo {\n    fn bar(&self) {}\n    fn baz(&self) {}\n}\n";
        let chunks = chunk(Path::new("lib.rs"), src, "repo", "main", "lib.rs", ChunkerConfig::default());
        let impl_chunk = chunks.iter().find(|c| c.chunk_type == ChunkType::Class).expect("impl chunk");
        assert!(impl_chunk.symbol_names.contains(&"bar".to_string()));
        assert!(impl_chunk.symbol_names.contains(&"baz".to_string()));
    }

    #[test]
    fn unsupported_extension_falls_back_to_line_windows() {
        let src = (1..=1200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let cfg = ChunkerConfig::default();
        let chunks = chunk(Path::new("notes.txt"), &src, "repo", "main", "notes.txt", cfg);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Other));
    }

    #[test]
    fn no_semantic_units_yields_single_module_chunk() {
        let src = "x = 1\ny = 2\nprint(x + y)\n";
        let chunks = chunk(Path::new("script.py"), src, "repo", "main", "script.py", ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Module);
    }
}
