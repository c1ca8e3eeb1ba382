//! C6 — Import-graph builder.
//!
//! Resolves each file's de-duplicated import strings to a path in the
//! indexed file set, without touching the filesystem: relative imports join
//! against the source directory, absolute-looking ones are tried at the repo
//! root and under conventional source prefixes, and a fixed extension
//! candidate order absorbs the TypeScript/JavaScript compile-output
//! convention (`./foo.js` resolving to a `foo.ts` source file).

use crate::model::{FileImport, ImportType};
use std::collections::HashSet;

const EXTENSIONLESS_CANDIDATES: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "mts", "py", "pyi"];
const SOURCE_PREFIXES: &[&str] = &["src", "lib", "app"];

pub struct ImportGraphBuilder<'a> {
    indexed_files: &'a HashSet<String>,
}

impl<'a> ImportGraphBuilder<'a> {
    pub fn new(indexed_files: &'a HashSet<String>) -> Self {
        ImportGraphBuilder { indexed_files }
    }

    /// Build edges for one file given its de-duplicated import list.
    pub fn edges_for_file(
        &self,
        source_file: &str,
        imports: &[String],
        repo_id: &str,
        branch: &str,
    ) -> Vec<FileImport> {
        let mut out = Vec::new();
        for raw in imports {
            let (import_str, dynamic) = strip_dynamic_marker(raw);
            if let Some(target) = self.resolve(source_file, import_str) {
                if target == source_file {
                    continue;
                }
                out.push(FileImport {
                    source_file: source_file.to_string(),
                    target_file: target,
                    repo_id: repo_id.to_string(),
                    branch: branch.to_string(),
                    import_type: if dynamic { ImportType::Dynamic } else { ImportType::Static },
                    imported_symbols: Vec::new(),
                });
            }
        }
        out
    }

    fn resolve(&self, source_file: &str, import_str: &str) -> Option<String> {
        if is_relative(import_str) {
            let base = join_relative(source_file, import_str);
            return self.try_extensions(&base);
        }
        let direct = normalize_absolute_like(import_str);
        if let Some(hit) = self.try_extensions(&direct) {
            return Some(hit);
        }
        for prefix in SOURCE_PREFIXES {
            let candidate = format!("{prefix}/{direct}");
            if let Some(hit) = self.try_extensions(&candidate) {
                return Some(hit);
            }
        }
        None
    }

    fn try_extensions(&self, base: &str) -> Option<String> {
        if let Some(hit) = self.exists(base) {
            return Some(hit);
        }
        if let Some(stripped) = base.strip_suffix(".js").or_else(|| base.strip_suffix(".jsx")).or_else(|| base.strip_suffix(".mjs")) {
            for ext in ["ts", "tsx", "mts"] {
                let candidate = format!("{stripped}.{ext}");
                if let Some(hit) = self.exists(&candidate) {
                    return Some(hit);
                }
            }
        }
        if !has_known_extension(base) {
            for ext in EXTENSIONLESS_CANDIDATES {
                let candidate = format!("{base}.{ext}");
                if let Some(hit) = self.exists(&candidate) {
                    return Some(hit);
                }
            }
            for ext in EXTENSIONLESS_CANDIDATES {
                let candidate = format!("{base}/index.{ext}");
                if let Some(hit) = self.exists(&candidate) {
                    return Some(hit);
                }
            }
            let init = format!("{base}/__init__.py");
            if let Some(hit) = self.exists(&init) {
                return Some(hit);
            }
        }
        None
    }

    fn exists(&self, candidate: &str) -> Option<String> {
        self.indexed_files.get(candidate).cloned()
    }
}

fn has_known_extension(path: &str) -> bool {
    EXTENSIONLESS_CANDIDATES.iter().any(|ext| path.ends_with(&format!(".{ext}")))
}

fn is_relative(import_str: &str) -> bool {
    import_str.starts_with("./") || import_str.starts_with("../") || (import_str.starts_with('.') && !import_str.starts_with(".."))
}

/// Strip `import(...)`-style dynamic markers; the extractor records those
/// verbatim and C6 only needs the bare path.
fn strip_dynamic_marker(raw: &str) -> (&str, bool) {
    if let Some(inner) = raw.strip_prefix("import(").and_then(|s| s.strip_suffix(')')) {
        (inner.trim_matches(|c| c == '"' || c == '\''), true)
    } else {
        (raw, false)
    }
}

/// Join a relative import (JS/TS `./x`, Python leading-dot `.x`/`..x`)
/// against the source file's directory, normalizing `.`/`..` without
/// touching the filesystem.
fn join_relative(source_file: &str, import_str: &str) -> String {
    let source_dir: Vec<&str> = source_file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("").split('/').filter(|s| !s.is_empty()).collect();

    let mut segments: Vec<String> = source_dir.iter().map(|s| s.to_string()).collect();

    if import_str.starts_with("./") || import_str.starts_with("../") {
        for part in import_str.split('/') {
            match part {
                "." | "" => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
    } else {
        // Python `.foo.bar` / `..foo.bar`: leading dot count = levels up
        // from the current package (one dot = current package).
        let dots = import_str.chars().take_while(|c| *c == '.').count();
        for _ in 1..dots {
            segments.pop();
        }
        let rest = &import_str[dots..];
        if !rest.is_empty() {
            segments.extend(rest.split('.').map(|s| s.to_string()));
        }
    }
    segments.join("/")
}

/// Dotted/absolute-looking module paths (`a.b.c`, `java.util.List`,
/// `github.com/org/repo/pkg`) normalized to a slash path. Already-slashed
/// paths pass through unchanged.
fn normalize_absolute_like(import_str: &str) -> String {
    if import_str.contains('/') {
        import_str.trim_start_matches('/').to_string()
    } else {
        import_str.replace('.', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn relative_import_resolves_sibling() {
        let files = indexed(&["src/a.ts", "src/b.ts"]);
        let builder = ImportGraphBuilder::new(&files);
        let edges = builder.edges_for_file("src/a.ts", &["./b".to_string()], "r", "main");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_file, "src/b.ts");
    }

    #[test]
    fn js_suffix_resolves_to_ts_sibling() {
        let files = indexed(&["src/a.ts", "src/b.ts"]);
        let builder = ImportGraphBuilder::new(&files);
        let edges = builder.edges_for_file("src/a.ts", &["./b.js".to_string()], "r", "main");
        assert_eq!(edges[0].target_file, "src/b.ts");
    }

    #[test]
    fn python_relative_parent_package() {
        let files = indexed(&["pkg/sub/mod_a.py", "pkg/mod_b.py"]);
        let builder = ImportGraphBuilder::new(&files);
        let edges = builder.edges_for_file("pkg/sub/mod_a.py", &["..mod_b".to_string()], "r", "main");
        assert_eq!(edges[0].target_file, "pkg/mod_b.py");
    }

    #[test]
    fn absolute_like_resolves_under_src_prefix() {
        let files = indexed(&["src/widgets/thing.ts"]);
        let builder = ImportGraphBuilder::new(&files);
        let edges = builder.edges_for_file("src/main.ts", &["widgets/thing".to_string()], "r", "main");
        assert_eq!(edges[0].target_file, "src/widgets/thing.ts");
    }

    #[test]
    fn unresolvable_import_yields_no_edge() {
        let files = indexed(&["src/a.ts"]);
        let builder = ImportGraphBuilder::new(&files);
        let edges = builder.edges_for_file("src/a.ts", &["left-pad".to_string()], "r", "main");
        assert!(edges.is_empty());
    }
}
