//! C4/C5 — per-file symbol/import/export extraction and per-chunk call-site
//! extraction. Both walk the tree tree-sitter already built for chunking;
//! nothing here re-parses.

pub mod calls;
pub mod symbols;
