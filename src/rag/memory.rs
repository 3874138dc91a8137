use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{rank_nearest, IndexedEntry, ScoredEntry, VectorStore};
use crate::core::errors::IndexError;

/// Process-local index; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryVectorStore {
    sessions: RwLock<HashMap<String, Vec<IndexedEntry>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert_batch(
        &self,
        session_id: &str,
        entries: Vec<IndexedEntry>,
    ) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .extend(entries);
        Ok(())
    }

    async fn query(
        &self,
        session_id: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredEntry>, IndexError> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(entries) => rank_nearest(embedding, entries, k),
            None => Ok(Vec::new()),
        }
    }

    async fn count(&self, session_id: Option<&str>) -> Result<usize, IndexError> {
        let sessions = self.sessions.read().await;
        Ok(match session_id {
            Some(id) => sessions.get(id).map(Vec::len).unwrap_or(0),
            None => sessions.values().map(Vec::len).sum(),
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<usize, IndexError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(session_id).map(|e| e.len()).unwrap_or(0))
    }

    async fn reset(&self) -> Result<(), IndexError> {
        self.sessions.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::Chunk;

    fn entry(text: &str, embedding: Vec<f32>) -> IndexedEntry {
        IndexedEntry::new(Chunk::new(text, "https://example.com"), embedding)
    }

    #[tokio::test]
    async fn queries_are_scoped_to_session() {
        let store = InMemoryVectorStore::new();
        store
            .insert_batch("s1", vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])])
            .await
            .unwrap();
        store
            .insert_batch("s2", vec![entry("c", vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.query("s1", &[1.0, 0.0], 5).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);

        assert!(store.query("missing", &[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_session_leaves_other_sessions() {
        let store = InMemoryVectorStore::new();
        store.insert_batch("s1", vec![entry("a", vec![1.0])]).await.unwrap();
        store.insert_batch("s2", vec![entry("b", vec![1.0])]).await.unwrap();

        assert_eq!(store.delete_session("s1").await.unwrap(), 1);
        assert_eq!(store.delete_session("s1").await.unwrap(), 0);
        assert_eq!(store.count(Some("s1")).await.unwrap(), 0);
        assert_eq!(store.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let store = InMemoryVectorStore::new();
        store.insert_batch("s1", vec![entry("a", vec![1.0])]).await.unwrap();
        store.insert_batch("s2", vec![entry("b", vec![1.0])]).await.unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}
