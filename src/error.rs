//! Library error types, grouped by the crate area that raises them.
//!
//! Matches the error kinds enumerated in the indexing/query design: most are
//! recovered locally (counted, logged) and never reach a caller as an `Err`.
//! The variants here are the ones that legitimately propagate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported language for {0}")]
    UnsupportedLanguage(String),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("relationship endpoint missing: {0}")]
    MissingEndpoint(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Errors the query engine (C13) surfaces to the API façade.
///
/// Only `InputInvalid` and `NotFound` are meant to be rendered to callers;
/// everything else collapses to an opaque 500 at the façade boundary.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid input: {0}")]
    InputInvalid(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("embedding model failure: {0}")]
    Embed(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("embedding model failure: {0}")]
    Embed(String),
    #[error("schema migration failed: {0}")]
    Migration(String),
    #[error("file read/decode failure: {0}")]
    FileSkipped(String),
}
