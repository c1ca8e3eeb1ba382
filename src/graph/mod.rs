//! C6/C7/C8 — the three graph builders. Each is idempotent for a given
//! `(repo_id, branch)`: the orchestrator deletes and re-inserts their output
//! rather than diffing edges.

pub mod call_graph;
pub mod import_graph;
pub mod relationships;
