//! C9 — Embedding cache: a thin wrapper over the store's content-addressed
//! `embedding_cache` table. Strictly keyed by `(content_hash, model_name)`;
//! never by chunk id, file path, or repo, so entries are durable and shared
//! across every repository that happens to contain identical content.

use crate::error::IndexError;
use crate::model::{pad_embedding, EmbeddingCacheEntry, D_PAD};
use crate::store::Store;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct EmbeddingCache {
    store: Arc<dyn Store>,
    model_name: String,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn Store>, model_name: String) -> Self {
        EmbeddingCache { store, model_name }
    }

    /// Single round-trip lookup for every hash; hits atomically bump
    /// `last_used_at`/`hit_count` inside the store.
    pub async fn lookup(&self, hashes: &[String]) -> HashMap<String, Vec<f32>> {
        match self.store.cache_lookup(hashes, &self.model_name).await {
            Ok(hits) => {
                debug!(hits = hits.len(), requested = hashes.len(), "embedding cache lookup");
                hits
            }
            Err(err) => {
                warn!(error = %err, "embedding cache lookup failed; treating as all-miss");
                HashMap::new()
            }
        }
    }

    /// Upsert native-dimension vectors, padded to `D_PAD` before storage.
    /// Cache writes are advisory: a failure here never fails indexing
    /// (§7 `CacheFailure`).
    pub async fn store(&self, entries: &[(String, Vec<f32>)]) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let rows: Vec<EmbeddingCacheEntry> = entries
            .iter()
            .map(|(hash, native)| EmbeddingCacheEntry {
                content_hash: hash.clone(),
                model_name: self.model_name.clone(),
                embedding: pad_embedding(native),
                embedding_dim: native.len().min(D_PAD) as i32,
                created_at: now,
                last_used_at: now,
                hit_count: 0,
            })
            .collect();
        if let Err(err) = self.store.cache_store(&rows).await {
            warn!(error = %err, "embedding cache write failed, continuing");
        }
        Ok(())
    }
}
