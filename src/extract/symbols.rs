//! C4 — Symbol / import / export extractor.
//!
//! One pass per file: imports come out as the module path exactly as
//! written (language-shape dependent, see `language::ImportShape`); exports
//! come out as declared names following an export-like construct, or via
//! `__all__` for Python. Deduplicated, declaration order preserved.

use crate::language::{self, ImportShape, LanguageSpec};
use crate::model::Chunk;
use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, Default)]
pub struct FileSymbols {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

pub fn extract(path: &Path, content: &str) -> FileSymbols {
    let Some(spec) = language::spec_for_path(path) else {
        return FileSymbols::default();
    };
    let mut parser = Parser::new();
    if parser.set_language(&(spec.grammar)()).is_err() {
        return FileSymbols::default();
    }
    let Some(tree) = parser.parse(content, None) else {
        return FileSymbols::default();
    };

    let bytes = content.as_bytes();
    let mut imports = Vec::new();
    let mut exports = Vec::new();
    walk(tree.root_node(), spec, bytes, &mut imports, &mut exports);

    FileSymbols {
        imports: dedup_preserve_order(imports),
        exports: dedup_preserve_order(exports),
    }
}

/// C2's gap-fill note ("preserving file-level imports in those chunks'
/// imports field") generalizes: every chunk in a file carries that file's
/// whole import/export list, since relationship building (C7) matches
/// against a chunk's `imports`/`exports` regardless of which unit it is.
pub fn backfill_file_level(chunks: &mut [Chunk], symbols: &FileSymbols) {
    for chunk in chunks {
        chunk.imports = symbols.imports.clone();
        chunk.exports = symbols.exports.clone();
    }
}

fn dedup_preserve_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

fn walk(node: Node, spec: &LanguageSpec, src: &[u8], imports: &mut Vec<String>, exports: &mut Vec<String>) {
    let kind = node.kind();
    if spec.import_kinds.contains(&kind) {
        imports.extend(import_paths(node, spec, src));
    }
    if spec.export_kinds.contains(&kind) {
        exports.extend(export_names(node, spec, src));
    }
    if spec.id == "python" && kind == "assignment" {
        if let Some(names) = python_dunder_all(node, src) {
            exports.extend(names);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, spec, src, imports, exports);
    }
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

fn import_paths(node: Node, spec: &LanguageSpec, src: &[u8]) -> Vec<String> {
    match spec.import_shape {
        ImportShape::QuotedString => find_strings(node, src).into_iter().take(1).collect(),
        ImportShape::QuotedGroup => find_strings(node, src),
        ImportShape::Dotted => dotted_path(node, spec, src).into_iter().collect(),
        ImportShape::UsePath => rust_use_path(node, src).into_iter().collect(),
        ImportShape::IncludeHeader => include_header(node, src).into_iter().collect(),
        ImportShape::RequireCall => require_call_arg(node, src).into_iter().collect(),
        ImportShape::None => Vec::new(),
    }
}

fn find_strings(node: Node, src: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "string" || child.kind() == "string_literal" || child.kind() == "interpreted_string_literal"
        {
            out.push(strip_quotes(text(child, src)).to_string());
        } else {
            out.extend(find_strings(child, src));
        }
    }
    out
}

/// Python `import a.b.c` / `from a.b import c` -> `a.b.c` / `a.b`. Java
/// `import a.b.Thing;` -> `a.b.Thing`. C# `using A.B;` -> `A.B`. PHP
/// `use A\B\Thing;` -> the dotted path node's own text.
fn dotted_path(node: Node, spec: &LanguageSpec, src: &[u8]) -> Option<String> {
    if spec.id == "python" {
        if let Some(module) = node.child_by_field_name("module_name") {
            return Some(text(module, src).to_string());
        }
        // plain `import a.b.c`: first dotted_name/identifier child.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "dotted_name" || child.kind() == "aliased_import" {
                return Some(text(child, src).trim().to_string());
            }
        }
        return None;
    }
    // Java/C#/PHP: grab the scoped/qualified-name-ish child text, trimming
    // keywords and trailing `;`.
    let raw = text(node, src);
    let trimmed = raw
        .trim_start_matches("import")
        .trim_start_matches("using")
        .trim_start_matches("use")
        .trim()
        .trim_end_matches(';')
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.replace('\\', "."))
    }
}

fn rust_use_path(node: Node, src: &[u8]) -> Option<String> {
    let raw = text(node, src);
    let body = raw.trim_start_matches("use").trim().trim_end_matches(';').trim();
    let path = body.split('{').next().unwrap_or(body).trim().trim_end_matches("::");
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

fn include_header(node: Node, src: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "string_literal" || child.kind() == "system_lib_string" {
            let raw = text(child, src);
            return Some(raw.trim_matches(|c| c == '"' || c == '<' || c == '>').to_string());
        }
    }
    None
}

fn require_call_arg(node: Node, src: &[u8]) -> Option<String> {
    let callee = node.child_by_field_name("method").map(|n| text(n, src))?;
    if callee != "require" && callee != "require_relative" {
        return None;
    }
    find_strings(node, src).into_iter().next()
}

fn export_names(node: Node, spec: &LanguageSpec, src: &[u8]) -> Vec<String> {
    if spec.id == "javascript" || spec.id == "typescript" || spec.id == "tsx" {
        return js_export_names(node, src);
    }
    Vec::new()
}

fn js_export_names(node: Node, src: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(source) = node.child_by_field_name("source") {
        // `export * from "m"` -> recorded verbatim.
        if node.child(1).map(|n| n.kind()) == Some("*") {
            out.push(format!("* from {}", strip_quotes(text(source, src))));
            return out;
        }
    }
    if let Some(decl) = node.child_by_field_name("declaration") {
        match decl.kind() {
            "function_declaration" | "class_declaration" | "generator_function_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    out.push(text(name, src).to_string());
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = decl.walk();
                for child in decl.children(&mut cursor) {
                    if child.kind() == "variable_declarator" {
                        if let Some(name) = child.child_by_field_name("name") {
                            out.push(text(name, src).to_string());
                        }
                    }
                }
            }
            _ => {}
        }
        return out;
    }
    // `export default ...` / `export { a, b }`.
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(text(child, src).to_string()),
            "export_clause" => {
                let mut inner = child.walk();
                for spec_node in child.children(&mut inner) {
                    if spec_node.kind() == "export_specifier" {
                        if let Some(name) = spec_node.child_by_field_name("name") {
                            out.push(text(name, src).to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    if out.is_empty() && node.child(1).map(|n| n.kind()) == Some("default") {
        out.push("default".to_string());
    }
    out
}

/// `__all__ = ["a", "b"]` at module scope.
fn python_dunder_all(node: Node, src: &[u8]) -> Option<Vec<String>> {
    let left = node.child_by_field_name("left")?;
    if text(left, src) != "__all__" {
        return None;
    }
    let right = node.child_by_field_name("right")?;
    Some(find_strings(right, src))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_from_import_yields_module() {
        let symbols = extract(Path::new("m.py"), "from a.b import c\n");
        assert_eq!(symbols.imports, vec!["a.b".to_string()]);
    }

    #[test]
    fn python_dunder_all_becomes_exports() {
        let symbols = extract(Path::new("m.py"), "__all__ = [\"foo\", \"bar\"]\n");
        assert_eq!(symbols.exports, vec!["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn rust_use_path_stops_before_brace() {
        let symbols = extract(Path::new("lib.rs"), "use std::collections::{HashMap, HashSet};\n");
        assert_eq!(symbols.imports, vec!["std::collections".to_string()]);
    }

    #[test]
    fn typescript_import_yields_quoted_source() {
        let symbols = extract(Path::new("m.ts"), "import { foo } from \"./foo\";\n");
        assert_eq!(symbols.imports, vec!["./foo".to_string()]);
    }

    #[test]
    fn typescript_export_function_is_named() {
        let symbols = extract(Path::new("m.ts"), "export function run() {}\n");
        assert_eq!(symbols.exports, vec!["run".to_string()]);
    }
}
