
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `embeddings` table; the vector is kept as its JSON text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EmbeddingRow {
    pub id: i64,
    pub chunk: String,
    pub embedding: String,
    pub created_date: NaiveDateTime,
}

impl EmbeddingRow {
    /// Decode the stored JSON array of floats
    #[inline]
    pub fn vector(&self) -> Result<Vec<f32>> {
        serde_json::from_str(&self.embedding)
            .with_context(|| format!("Corrupt embedding stored for chunk {}", self.id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmbedding<'a> {
    pub chunk: &'a str,
    pub embedding: &'a [f32],
}

impl NewEmbedding<'_> {
    #[inline]
    pub fn encoded_embedding(&self) -> Result<String> {
        serde_json::to_string(self.embedding).context("Failed to encode embedding")
    }
}

/// The singleton `model_state` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ModelState {
    pub vectorizer: String,
    pub last_updated: NaiveDateTime,
}
