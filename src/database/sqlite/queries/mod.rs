#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

pub struct EmbeddingQueries;

impl EmbeddingQueries {
    #[inline]
    pub async fn insert(conn: &mut SqliteConnection, new: &NewEmbedding<'_>) -> Result<i64> {
        let encoded = new.encoded_embedding()?;
        let id = sqlx::query("INSERT INTO embeddings (chunk, embedding) VALUES (?, ?)")
            .bind(new.chunk)
            .bind(encoded)
            .execute(conn)
            .await
            .context("Failed to insert embedding")?
            .last_insert_rowid();

        Ok(id)
    }

    #[inline]
    pub async fn delete_all(conn: &mut SqliteConnection) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM embeddings")
            .execute(conn)
            .await
            .context("Failed to clear embeddings")?
            .rows_affected();

        debug!("Deleted {} stored embeddings", deleted);
        Ok(deleted)
    }

    /// All rows in insertion order
    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<EmbeddingRow>> {
        sqlx::query_as::<_, EmbeddingRow>(
            "SELECT id, chunk, embedding, created_date FROM embeddings ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
        .context("Failed to load embeddings")
    }

    /// Most recently inserted chunks, newest first
    #[inline]
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT chunk FROM embeddings ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("Failed to load recent chunks")
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM embeddings")
            .fetch_one(pool)
            .await
            .context("Failed to count embeddings")
    }

    /// The oldest stored chunk, used for diagnostics
    #[inline]
    pub async fn first_chunk(pool: &SqlitePool) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT chunk FROM embeddings ORDER BY id ASC LIMIT 1")
            .fetch_optional(pool)
            .await
            .context("Failed to load sample chunk")
    }
}

pub struct ModelStateQueries;

impl ModelStateQueries {
    #[inline]
    pub async fn upsert(conn: &mut SqliteConnection, vectorizer: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO model_state (id, vectorizer, last_updated)
            VALUES (1, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                vectorizer = excluded.vectorizer,
                last_updated = CURRENT_TIMESTAMP
            ",
        )
        .bind(vectorizer)
        .execute(conn)
        .await
        .context("Failed to save vectorizer state")?;

        Ok(())
    }

    #[inline]
    pub async fn clear(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("DELETE FROM model_state")
            .execute(conn)
            .await
            .context("Failed to clear vectorizer state")?;

        Ok(())
    }

    #[inline]
    pub async fn get(pool: &SqlitePool) -> Result<Option<ModelState>> {
        sqlx::query_as::<_, ModelState>(
            "SELECT vectorizer, last_updated FROM model_state WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
        .context("Failed to load vectorizer state")
    }
}
