//! Sentence embeddings for chunk indexing and query retrieval.

#[cfg(feature = "fastembed")]
pub mod local;
pub mod remote;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::config::settings::{EmbeddingBackend, EmbeddingSettings};
use crate::core::errors::EmbeddingError;

pub use remote::RemoteEmbedder;

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(vec![text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }
}

/// Builds the configured embedder. Local models are cached under `cache_dir`.
pub fn build_embedder(
    settings: &EmbeddingSettings,
    client: Client,
    cache_dir: &Path,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match settings.provider {
        EmbeddingBackend::Remote => {
            let base_url = settings
                .base_url
                .clone()
                .ok_or_else(|| EmbeddingError::Provider("embedding.base_url is not set".into()))?;
            Ok(Arc::new(RemoteEmbedder::new(
                client,
                base_url,
                settings.api_key.clone(),
                settings.model.clone(),
            )))
        }
        #[cfg(feature = "fastembed")]
        EmbeddingBackend::Fastembed => Ok(Arc::new(local::FastEmbedder::try_new(
            &settings.model,
            cache_dir,
        )?)),
        #[cfg(not(feature = "fastembed"))]
        EmbeddingBackend::Fastembed => {
            let _ = cache_dir;
            Err(EmbeddingError::UnsupportedModel(format!(
                "{} (built without the fastembed feature)",
                settings.model
            )))
        }
    }
}
