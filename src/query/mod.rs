//! C13 — Query engine: the read-only surface over a store/branch's chunks
//! and graph edges, everything the API façade (C15) and CLI `--verify` mode
//! need.

pub mod engine;

pub use engine::{
    CallDirection, CallGraphEdge, CallGraphNode, CallGraphResult, Cycle, CycleType, DefinitionResult, HubFile,
    HybridScoredChunk, HybridSearchResponse, ImportTree, IntegrityReport, IntegrityViolation, QueryEngine, ScoredChunk,
    UsageResult, UsageType,
};
