//! Local static-embedding `Embedder` backed by `model2vec-rs`: no network
//! calls at embed time, the model weights are resolved once at construction
//! (HF Hub cache or local path) the way the teacher's `vector_store`/`server`
//! modules already do via `StaticModel::from_pretrained`.

use super::Embedder;
use crate::error::IndexError;
use model2vec_rs::model::StaticModel;

pub struct Model2VecEmbedder {
    model: StaticModel,
    model_name: String,
    native_dim: usize,
}

impl Model2VecEmbedder {
    pub fn load(model_name: &str) -> Result<Self, IndexError> {
        let model = StaticModel::from_pretrained(model_name, None, None, None)
            .map_err(|e| IndexError::Embed(format!("failed to load {model_name}: {e}")))?;
        let native_dim = model.encode_single("").len();
        Ok(Model2VecEmbedder { model, model_name: model_name.to_string(), native_dim })
    }
}

impl Embedder for Model2VecEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn native_dim(&self) -> usize {
        self.native_dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(self.model.encode(texts))
    }
}
