use std::sync::Arc;

use uuid::Uuid;

use super::store::{IndexedEntry, ScoredEntry, VectorStore};
use super::types::Chunk;
use crate::core::errors::{EmbeddingError, IndexError};
use crate::embedding::Embedder;

/// Per-request view of a [`VectorStore`].
///
/// Everything added through a session is stored under its id, and
/// [`cleanup`](Self::cleanup) removes exactly those entries.
pub struct VectorStoreSession {
    id: String,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorStoreSession {
    pub fn open(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        let id = format!("session_{}", &Uuid::new_v4().simple().to_string()[..8]);
        Self::with_id(id, store, embedder)
    }

    pub fn with_id(
        id: impl Into<String>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            id: id.into(),
            store,
            embedder,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Embeds and indexes `chunks`, returning how many were stored.
    pub async fn add(&self, chunks: Vec<Chunk>) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            }
            .into());
        }

        let entries: Vec<IndexedEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedEntry::new(chunk, embedding))
            .collect();
        let added = entries.len();
        self.store.insert_batch(&self.id, entries).await?;
        tracing::debug!("Indexed {} chunks in {}", added, self.id);
        Ok(added)
    }

    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredEntry>, IndexError> {
        let embedding = self.embedder.embed_one(text).await?;
        self.store.query(&self.id, &embedding, k).await
    }

    pub async fn len(&self) -> Result<usize, IndexError> {
        self.store.count(Some(&self.id)).await
    }

    pub async fn cleanup(&self) -> Result<usize, IndexError> {
        let removed = self.store.delete_session(&self.id).await?;
        tracing::debug!("Removed {} entries for {}", removed, self.id);
        Ok(removed)
    }
}
