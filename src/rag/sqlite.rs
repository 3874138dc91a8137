//! SQLite-backed vector store.
//!
//! Entries live in a single table keyed by session; search is brute-force
//! squared L2 over the session's rows.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::store::{rank_nearest, IndexedEntry, ScoredEntry, VectorStore};
use super::types::Chunk;
use crate::core::config::AppPaths;
use crate::core::errors::IndexError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, IndexError> {
        Self::with_path(paths.user_data_dir.join("index.db")).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), IndexError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vector_entries (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                text TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_vector_entries_session ON vector_entries(session_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<IndexedEntry, IndexError> {
        let id: String = row.get("id");
        let embedding: Vec<u8> = row.get("embedding");
        Ok(IndexedEntry {
            id: Uuid::parse_str(&id)
                .map_err(|err| IndexError::Storage(format!("invalid entry id {}: {}", id, err)))?,
            chunk: Chunk::new(row.get::<String, _>("text"), row.get::<String, _>("source")),
            embedding: Self::deserialize_embedding(&embedding),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(
        &self,
        session_id: &str,
        entries: Vec<IndexedEntry>,
    ) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for entry in &entries {
            let blob = Self::serialize_embedding(&entry.embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO vector_entries (id, session_id, text, source, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(entry.id.to_string())
            .bind(session_id)
            .bind(&entry.chunk.text)
            .bind(&entry.chunk.source)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        session_id: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredEntry>, IndexError> {
        let rows = sqlx::query(
            "SELECT id, text, source, embedding
             FROM vector_entries
             WHERE session_id = ?1
             ORDER BY rowid",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(Self::row_to_entry)
            .collect::<Result<Vec<_>, _>>()?;

        rank_nearest(embedding, &entries, k)
    }

    async fn count(&self, session_id: Option<&str>) -> Result<usize, IndexError> {
        let count: i64 = if let Some(session_id) = session_id {
            sqlx::query_scalar("SELECT COUNT(*) FROM vector_entries WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM vector_entries")
                .fetch_one(&self.pool)
                .await?
        };

        Ok(count as usize)
    }

    async fn delete_session(&self, session_id: &str) -> Result<usize, IndexError> {
        let result = sqlx::query("DELETE FROM vector_entries WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }

    async fn reset(&self) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM vector_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
