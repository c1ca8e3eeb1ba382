//! Embedding model boundary. The spec treats the embedding model as an
//! external, interface-only collaborator; `Embedder` is that seam, with
//! `model2vec::Model2VecEmbedder` the one concrete, local (no GPU/network)
//! implementation.

pub mod cache;
pub mod model2vec;

use crate::error::IndexError;

/// Maps text to a fixed-dimension native embedding. `native_dim()` is the
/// un-padded dimension the concrete model produces; callers pad to
/// `model::D_PAD` before storage.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    fn native_dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        Ok(self.embed_batch(&[text.to_string()])?.remove(0))
    }
}
