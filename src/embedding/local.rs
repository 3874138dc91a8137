use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::Embedder;
use crate::core::errors::EmbeddingError;

/// Local ONNX sentence embeddings. Inference runs on the blocking pool.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    name: String,
}

impl FastEmbedder {
    pub fn try_new(model_name: &str, cache_dir: &Path) -> Result<Self, EmbeddingError> {
        let model = resolve_model(model_name)?;
        tracing::info!(
            "Loading embedding model {} (cache: {})",
            model_name,
            cache_dir.display()
        );
        let options = InitOptions::new(model)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(false);
        let embedding =
            TextEmbedding::try_new(options).map_err(|err| EmbeddingError::Model(err.to_string()))?;

        Ok(Self {
            model: Arc::new(embedding),
            name: model_name.to_string(),
        })
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            Ok(EmbeddingModel::AllMiniLML12V2)
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbeddingError::UnsupportedModel(other.to_string())),
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|err| EmbeddingError::Task(err.to_string()))?
            .map_err(|err| EmbeddingError::Model(err.to_string()))?;

        if vectors.len() != expected {
            return Err(EmbeddingError::CountMismatch {
                expected,
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}
