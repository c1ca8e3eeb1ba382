//! C3 — Config-file chunker.
//!
//! Recognized config files bypass the AST chunker entirely and produce a
//! single `chunk_type=config` chunk carrying typed metadata as concise tags
//! in `symbol_names` (e.g. `target:ES2022`, `strict:true`).

use crate::model::{Chunk, ChunkType};
use std::path::Path;

/// Whether `file_path` (repo-relative) matches one of the recognized
/// config-file patterns (§4.3/§6), independent of whether its extension is
/// otherwise indexable (e.g. `Dockerfile`, `.eslintrc`, `go.mod` carry no
/// extension C1 parses). Takes the full relative path, not just the
/// basename, since CI configs are recognized by directory (`.github/workflows/`).
pub fn is_recognized_config_name(file_path: &str) -> bool {
    classify(file_path).is_some()
}

pub fn try_chunk(path: &Path, content: &str, repo_id: &str, branch: &str, file_path: &str) -> Option<Chunk> {
    let kind = classify(file_path)?;
    let basename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| file_path.to_string());
    let tags = extract_tags(kind, content);
    let total_lines = content.lines().count().max(1) as u32;

    Some(Chunk {
        id: crate::model::chunk_id(repo_id, branch, file_path, 1, total_lines),
        file_path: file_path.to_string(),
        repo_id: repo_id.to_string(),
        branch: branch.to_string(),
        language: None,
        chunk_type: ChunkType::Config,
        symbol_name: Some(basename),
        symbol_names: tags,
        imports: Vec::new(),
        exports: Vec::new(),
        line_start: 1,
        line_end: total_lines,
        content_hash: crate::model::content_hash(content),
        content: content.to_string(),
        embedding: Vec::new(),
        full_text_index: content.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKind {
    TsConfig,
    EsLint,
    Prettier,
    PackageJson,
    PyProject,
    GoMod,
    CargoToml,
    Dockerfile,
    DockerCompose,
    Ci,
    EditorConfig,
    GenericRc,
    GenericJsConfig,
}

fn classify(path: &str) -> Option<ConfigKind> {
    let full_lower = path.to_lowercase();
    if is_ci_config(&full_lower) {
        return Some(ConfigKind::Ci);
    }
    let basename = full_lower.rsplit('/').next().unwrap_or(&full_lower);
    let lower = basename;
    if lower.starts_with("tsconfig") && lower.ends_with(".json") {
        return Some(ConfigKind::TsConfig);
    }
    if lower.starts_with("eslint.config.") {
        return Some(ConfigKind::EsLint);
    }
    if lower.starts_with(".eslintrc") {
        return Some(ConfigKind::EsLint);
    }
    if lower.starts_with(".prettierrc") {
        return Some(ConfigKind::Prettier);
    }
    if lower == "package.json" {
        return Some(ConfigKind::PackageJson);
    }
    if lower == "pyproject.toml" {
        return Some(ConfigKind::PyProject);
    }
    if lower == "go.mod" {
        return Some(ConfigKind::GoMod);
    }
    if lower == "cargo.toml" {
        return Some(ConfigKind::CargoToml);
    }
    if lower == "dockerfile" || lower.starts_with("dockerfile.") {
        return Some(ConfigKind::Dockerfile);
    }
    if lower.starts_with("docker-compose") && (lower.ends_with(".yml") || lower.ends_with(".yaml")) {
        return Some(ConfigKind::DockerCompose);
    }
    if lower == ".editorconfig" {
        return Some(ConfigKind::EditorConfig);
    }
    if lower.ends_with(".config.js")
        || lower.ends_with(".config.ts")
        || lower.ends_with(".config.mjs")
        || lower.ends_with(".config.cjs")
    {
        return Some(ConfigKind::GenericJsConfig);
    }
    if lower.ends_with("rc") && !lower.ends_with(".rs") {
        return Some(ConfigKind::GenericRc);
    }
    None
}

fn is_ci_config(lower: &str) -> bool {
    lower.contains(".github/workflows/") && (lower.ends_with(".yml") || lower.ends_with(".yaml"))
        || lower == ".gitlab-ci.yml"
        || lower == ".travis.yml"
        || lower == "azure-pipelines.yml"
}

/// Strip `//` and `/* */` comments so JSONC-ish config files parse as plain
/// JSON; a full JSON5 parser is overkill for the handful of fields we read.
fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn tolerant_json(content: &str) -> Option<serde_json::Value> {
    let stripped = strip_trailing_commas(&strip_jsonc_comments(content));
    serde_json::from_str(&stripped).ok()
}

fn extract_tags(kind: ConfigKind, content: &str) -> Vec<String> {
    match kind {
        ConfigKind::TsConfig => tsconfig_tags(content),
        ConfigKind::EsLint => eslint_tags(content),
        ConfigKind::PackageJson => package_json_tags(content),
        ConfigKind::PyProject => pyproject_tags(content),
        ConfigKind::GoMod => gomod_tags(content),
        ConfigKind::CargoToml => cargo_toml_tags(content),
        ConfigKind::Prettier
        | ConfigKind::Dockerfile
        | ConfigKind::DockerCompose
        | ConfigKind::Ci
        | ConfigKind::EditorConfig
        | ConfigKind::GenericRc
        | ConfigKind::GenericJsConfig => Vec::new(),
    }
}

fn tsconfig_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let Some(value) = tolerant_json(content) else { return tags };
    let Some(opts) = value.get("compilerOptions") else { return tags };
    if let Some(strict) = opts.get("strict").and_then(|v| v.as_bool()) {
        tags.push(format!("strict:{strict}"));
    }
    if let Some(target) = opts.get("target").and_then(|v| v.as_str()) {
        tags.push(format!("target:{target}"));
    }
    if let Some(module) = opts.get("module").and_then(|v| v.as_str()) {
        tags.push(format!("module:{module}"));
    }
    for key in ["jsx", "moduleResolution", "outDir"] {
        if let Some(v) = opts.get(key).and_then(|v| v.as_str()) {
            tags.push(format!("{key}:{v}"));
        }
    }
    tags
}

fn eslint_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(value) = tolerant_json(content) {
        if let Some(rules) = value.get("rules").and_then(|v| v.as_object()) {
            for rule in rules.keys() {
                tags.push(format!("rule:{rule}"));
            }
        }
        if let Some(extends) = value.get("extends") {
            let strict = match extends {
                serde_json::Value::String(s) => s.contains("strict"),
                serde_json::Value::Array(items) => items
                    .iter()
                    .any(|v| v.as_str().map(|s| s.contains("strict")).unwrap_or(false)),
                _ => false,
            };
            if strict {
                tags.push("extends:strict".to_string());
            }
        }
    } else if content.contains("strict") {
        tags.push("extends:strict".to_string());
    }
    tags
}

const KNOWN_DEPENDENCY_NAMES: &[&str] = &[
    "react", "vue", "angular", "express", "next", "typescript", "eslint", "prettier", "jest", "vitest", "webpack",
    "vite", "axios", "lodash", "tailwindcss",
];

fn package_json_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let Some(value) = tolerant_json(content) else { return tags };
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = value.get(section).and_then(|v| v.as_object()) {
            for name in deps.keys() {
                if KNOWN_DEPENDENCY_NAMES.contains(&name.as_str()) {
                    tags.push(format!("dep:{name}"));
                }
            }
        }
    }
    tags
}

fn pyproject_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let Ok(value) = toml::from_str::<toml::Value>(content) else { return tags };
    if let Some(version) = value
        .get("project")
        .and_then(|p| p.get("requires-python"))
        .and_then(|v| v.as_str())
    {
        tags.push(format!("python:{version}"));
    }
    if let Some(deps) = value.get("project").and_then(|p| p.get("dependencies")).and_then(|v| v.as_array()) {
        for dep in deps.iter().filter_map(|v| v.as_str()) {
            let name: String = dep.chars().take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_').collect();
            if !name.is_empty() {
                tags.push(format!("dep:{name}"));
            }
        }
    }
    if let Some(strict) = value
        .get("tool")
        .and_then(|t| t.get("mypy"))
        .and_then(|m| m.get("strict"))
        .and_then(|v| v.as_bool())
    {
        tags.push(format!("mypy_strict:{strict}"));
    }
    if let Some(select) = value
        .get("tool")
        .and_then(|t| t.get("ruff"))
        .and_then(|r| r.get("select"))
        .and_then(|v| v.as_array())
    {
        for rule in select.iter().filter_map(|v| v.as_str()) {
            tags.push(format!("ruff_select:{rule}"));
        }
    }
    tags
}

fn gomod_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if let Some(version) = line.strip_prefix("go ") {
            tags.push(format!("go:{}", version.trim()));
        }
        if let Some(module) = line.strip_prefix("module ") {
            tags.push(format!("module:{}", module.trim()));
        }
    }
    tags
}

fn cargo_toml_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let Ok(value) = toml::from_str::<toml::Value>(content) else { return tags };
    if let Some(edition) = value.get("package").and_then(|p| p.get("edition")).and_then(|v| v.as_str()) {
        tags.push(format!("edition:{edition}"));
    }
    for section in ["dependencies", "dev-dependencies"] {
        if let Some(deps) = value.get(section).and_then(|v| v.as_table()) {
            for name in deps.keys() {
                tags.push(format!("dep:{name}"));
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_package_json() {
        assert_eq!(classify("package.json"), Some(ConfigKind::PackageJson));
        assert_eq!(classify("tsconfig.base.json"), Some(ConfigKind::TsConfig));
        assert_eq!(classify("random.rs"), None);
    }

    #[test]
    fn tsconfig_extracts_strict_and_target() {
        let src = r#"{
            // trailing comment
            "compilerOptions": { "strict": true, "target": "ES2022", "module": "ESNext", }
        }"#;
        let tags = tsconfig_tags(src);
        assert!(tags.contains(&"strict:true".to_string()));
        assert!(tags.contains(&"target:ES2022".to_string()));
    }

    #[test]
    fn cargo_toml_extracts_edition_and_deps() {
        let src = "[package]\nedition = \"2021\"\n\n[dependencies]\nserde = \"1\"\n";
        let tags = cargo_toml_tags(src);
        assert!(tags.contains(&"edition:2021".to_string()));
        assert!(tags.contains(&"dep:serde".to_string()));
    }

    #[test]
    fn try_chunk_produces_config_chunk() {
        let chunk = try_chunk(
            Path::new("go.mod"),
            "module example.com/widgets\n\ngo 1.22\n",
            "repo",
            "main",
            "go.mod",
        )
        .expect("config chunk");
        assert_eq!(chunk.chunk_type, ChunkType::Config);
        assert!(chunk.symbol_names.iter().any(|t| t.starts_with("go:")));
    }
}
