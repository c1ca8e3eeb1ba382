//! Data model types from the specification's data model section: `File`,
//! `Chunk`, `Relationship`, `FileImport`, `EmbeddingCache`, plus the shared
//! `repo_id` derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Every chunk embedding is padded to this many dimensions before storage.
pub const D_PAD: usize = 1536;

/// Derive the repo-scoped join key: first 16 hex chars of SHA-256(repo_url).
pub fn repo_id(repo_url: &str) -> String {
    let digest = Sha256::digest(repo_url.as_bytes());
    hex_prefix(&digest, 16)
}

fn hex_prefix(bytes: &[u8], hex_chars: usize) -> String {
    let mut out = String::with_capacity(hex_chars);
    for byte in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
        if out.len() >= hex_chars {
            break;
        }
    }
    out.truncate(hex_chars);
    out
}

/// SHA-256 of UTF-8 content bytes, the sole cache key component alongside the
/// model name and the `content_hash` stored on every chunk.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("{digest:x}")
}

/// Deterministic chunk id derived from `(repo_id, branch, file_path, location)`
/// so that re-chunking an unchanged file on a later run reproduces the same
/// ids (UUIDv5 over a namespace-qualified string).
pub fn chunk_id(repo_id: &str, branch: &str, file_path: &str, line_start: u32, line_end: u32) -> Uuid {
    const NAMESPACE: Uuid = Uuid::from_bytes([
        0x7b, 0x3e, 0x9a, 0x10, 0x4c, 0x8b, 0x4a, 0x2f, 0x9d, 0x61, 0x2a, 0x0e, 0x5f, 0x31, 0x7c, 0x88,
    ]);
    let name = format!("{repo_id}\0{branch}\0{file_path}\0{line_start}-{line_end}");
    Uuid::new_v5(&NAMESPACE, name.as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Function,
    Class,
    Method,
    Interface,
    Module,
    Config,
    Other,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Function => "function",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
            ChunkType::Interface => "interface",
            ChunkType::Module => "module",
            ChunkType::Config => "config",
            ChunkType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Imports,
    References,
    Calls,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Imports => "imports",
            RelationshipType::References => "references",
            RelationshipType::Calls => "calls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    Static,
    Dynamic,
    ReExport,
}

/// `(repo_id, branch, path)` identifies a file; rows are created on first
/// chunk write, updated on incremental change, deleted when the path
/// disappears from the working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub repo_id: String,
    pub branch: String,
    pub language: Option<String>,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// A contiguous, semantically coherent slice of a file.
///
/// Invariants (enforced by the chunker and checked by
/// `query::engine::verify_integrity`):
/// - `line_start <= line_end`, both 1-indexed inclusive.
/// - `content_hash == sha256(content)`.
/// - `embedding.len() == D_PAD`; only the first `native_dim` entries are
///   non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub file_path: String,
    pub repo_id: String,
    pub branch: String,
    pub language: Option<String>,
    pub chunk_type: ChunkType,
    pub symbol_name: Option<String>,
    pub symbol_names: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub line_start: u32,
    pub line_end: u32,
    pub content: String,
    pub content_hash: String,
    pub embedding: Vec<f32>,
    /// Raw text the store indexes into its full-text column; normally equal
    /// to `content`, kept distinct so config chunks can index their typed
    /// metadata tags alongside the raw file text.
    pub full_text_index: String,
}

impl Chunk {
    pub fn native_embedding_len(&self) -> usize {
        self.embedding.iter().rev().skip_while(|v| **v == 0.0).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source_chunk_id: Uuid,
    pub target_chunk_id: Uuid,
    pub relationship_type: RelationshipType,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileImport {
    pub source_file: String,
    pub target_file: String,
    pub repo_id: String,
    pub branch: String,
    pub import_type: ImportType,
    pub imported_symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingCacheEntry {
    pub content_hash: String,
    pub model_name: String,
    pub embedding: Vec<f32>,
    pub embedding_dim: i32,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub hit_count: i64,
}

/// Pad a native-dimension embedding out to `D_PAD`, per spec: "the first d
/// native dims carry the model output, remaining D_pad - d are zero".
pub fn pad_embedding(native: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0f32; D_PAD];
    let n = native.len().min(D_PAD);
    out[..n].copy_from_slice(&native[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_is_16_hex_chars() {
        let id = repo_id("https://github.com/acme/widgets");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn chunk_id_is_deterministic() {
        let a = chunk_id("repo1", "main", "src/lib.rs", 10, 20);
        let b = chunk_id("repo1", "main", "src/lib.rs", 10, 20);
        assert_eq!(a, b);
        let c = chunk_id("repo1", "main", "src/lib.rs", 10, 21);
        assert_ne!(a, c);
    }

    #[test]
    fn content_hash_matches_sha256() {
        let h = content_hash("hello");
        assert_eq!(h, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
        assert_eq!(h.len(), 64);
    }

    #[test]
    fn pad_embedding_zero_fills_tail() {
        let padded = pad_embedding(&[1.0, 2.0, 3.0]);
        assert_eq!(padded.len(), D_PAD);
        assert_eq!(&padded[..3], &[1.0, 2.0, 3.0]);
        assert!(padded[3..].iter().all(|v| *v == 0.0));
    }
}
