//! VectorStore trait: abstract interface for embedding index backends.
//!
//! Entries are grouped by session id. Queries only ever see the entries of
//! the session they name, and `delete_session` removes exactly those.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Chunk;
use crate::core::errors::IndexError;

/// A chunk with its embedding, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub id: Uuid,
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl IndexedEntry {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk,
            embedding,
        }
    }
}

/// Result of a similarity query. Lower distance is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub id: Uuid,
    pub chunk: Chunk,
    pub distance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert entries under `session_id`.
    async fn insert_batch(
        &self,
        session_id: &str,
        entries: Vec<IndexedEntry>,
    ) -> Result<(), IndexError>;

    /// The `k` entries of `session_id` nearest to `embedding`, nearest first.
    async fn query(
        &self,
        session_id: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredEntry>, IndexError>;

    /// Entry count, for one session or the whole store.
    async fn count(&self, session_id: Option<&str>) -> Result<usize, IndexError>;

    /// Delete all entries of a session, returning how many were removed.
    async fn delete_session(&self, session_id: &str) -> Result<usize, IndexError>;

    /// Discard every entry of every session.
    async fn reset(&self) -> Result<(), IndexError>;
}

pub fn squared_l2(query: &[f32], candidate: &[f32]) -> Result<f32, IndexError> {
    if query.len() != candidate.len() {
        return Err(IndexError::DimensionMismatch {
            query: query.len(),
            entry: candidate.len(),
        });
    }
    Ok(query
        .iter()
        .zip(candidate)
        .map(|(a, b)| (a - b) * (a - b))
        .sum())
}

/// Ranks `entries` by ascending squared L2 distance to `query`, keeping `k`.
///
/// Ties keep insertion order.
pub fn rank_nearest<'a, I>(query: &[f32], entries: I, k: usize) -> Result<Vec<ScoredEntry>, IndexError>
where
    I: IntoIterator<Item = &'a IndexedEntry>,
{
    let mut scored = Vec::new();
    for entry in entries {
        scored.push(ScoredEntry {
            id: entry.id,
            chunk: entry.chunk.clone(),
            distance: squared_l2(query, &entry.embedding)?,
        });
    }

    scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}
