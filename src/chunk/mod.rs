//! Chunking entry point: dispatches a file to the config-file chunker (C3)
//! when its name matches a recognized pattern, otherwise to the AST chunker
//! (C2). Both paths produce the same `model::Chunk` shape.

pub mod ast;
pub mod config_file;

use crate::model::Chunk;
use std::path::Path;

/// Thresholds that shape chunk boundaries; defaults match spec §4.2/§4.10.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// A nested function at or above this line count is split into its own
    /// chunk instead of staying inlined in its parent's text.
    pub nested_threshold: u32,
    /// Fallback fixed-window size when AST chunking yields nothing.
    pub fallback_max_lines: u32,
    /// Back-overlap between consecutive fallback windows.
    pub fallback_overlap_lines: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            nested_threshold: 50,
            fallback_max_lines: 500,
            fallback_overlap_lines: 50,
        }
    }
}

/// Chunk one file's contents. `repo_id`/`branch`/`file_path` are stamped onto
/// every chunk the way the orchestrator (C10) needs them for id derivation.
pub fn chunk_file(
    path: &Path,
    content: &str,
    repo_id: &str,
    branch: &str,
    file_path: &str,
    cfg: ChunkerConfig,
) -> Vec<Chunk> {
    if let Some(config_chunk) = config_file::try_chunk(path, content, repo_id, branch, file_path) {
        return vec![config_chunk];
    }
    ast::chunk(path, content, repo_id, branch, file_path, cfg)
}
