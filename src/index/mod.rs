//! C10 — Indexing orchestrator: full and incremental pipelines that turn a
//! working copy into rows in the `Store`.

pub mod orchestrator;

pub use orchestrator::{IndexStats, Orchestrator};
