#[cfg(test)]
mod tests;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::sqlite::Database;
use super::sqlite::models::NewEmbedding;
use super::sqlite::queries::{EmbeddingQueries, ModelStateQueries};
use crate::embeddings::{EmbeddingBackendKind, TfidfVectorizer};
use crate::{RagError, Result};

/// A stored chunk scored against a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub chunk: String,
    pub similarity: f32,
}

/// Chunk/vector store backed by SQLite.
///
/// Writers replace the whole corpus inside one transaction while holding the
/// write lock, so readers never see a partially replaced store.
#[derive(Debug)]
pub struct VectorStore {
    database: Database,
    lock: RwLock<()>,
}

fn database_error(error: anyhow::Error) -> RagError {
    RagError::Database(format!("{error:#}"))
}

impl VectorStore {
    #[inline]
    pub fn new(database: Database) -> Self {
        Self {
            database,
            lock: RwLock::new(()),
        }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Atomically swap the stored corpus for `chunks`/`vectors`.
    ///
    /// The vectorizer state is upserted when given and cleared otherwise.
    #[inline]
    pub async fn replace_all(
        &self,
        chunks: &[String],
        vectors: &[Vec<f32>],
        vectorizer: Option<&TfidfVectorizer>,
    ) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(RagError::Embedding(format!(
                "Got {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        if chunks.is_empty() {
            return Err(RagError::NoContent);
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if let Some(other) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: other.len(),
            });
        }

        let vectorizer_json = vectorizer
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RagError::Database(format!("Failed to encode vectorizer: {e}")))?;

        let _guard = self.lock.write().await;

        let mut tx = self
            .database
            .pool()
            .begin()
            .await
            .map_err(|e| RagError::Database(format!("Failed to begin transaction: {e}")))?;

        let removed = EmbeddingQueries::delete_all(&mut tx)
            .await
            .map_err(database_error)?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            EmbeddingQueries::insert(
                &mut tx,
                &NewEmbedding {
                    chunk,
                    embedding: vector,
                },
            )
            .await
            .map_err(database_error)?;
        }

        let saved_state = match vectorizer_json {
            Some(json) => ModelStateQueries::upsert(&mut tx, &json).await,
            None => ModelStateQueries::clear(&mut tx).await,
        };
        saved_state.map_err(database_error)?;

        tx.commit()
            .await
            .map_err(|e| RagError::Database(format!("Failed to commit transaction: {e}")))?;

        info!(
            "Replaced {} stored chunks with {} new chunks ({} dimensions)",
            removed,
            chunks.len(),
            dimension
        );

        Ok(chunks.len())
    }

    /// Top-K stored chunks by cosine similarity, ties in insertion order
    #[inline]
    pub async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SimilarityResult>> {
        let _guard = self.lock.read().await;

        let rows = EmbeddingQueries::list_all(self.database.pool())
            .await
            .map_err(database_error)?;
        if rows.is_empty() {
            return Err(RagError::StoreNotInitialized);
        }

        let mut dimension = None;
        let mut skipped = 0_usize;
        let mut scored = Vec::with_capacity(rows.len());

        for row in rows {
            let stored = row.vector().map_err(database_error)?;
            let expected = *dimension.get_or_insert(stored.len());
            if stored.len() != expected {
                skipped += 1;
                continue;
            }
            scored.push((row.chunk, stored));
        }

        if skipped > 0 {
            warn!(
                "Skipped {} stored vectors whose dimension differs from {}",
                skipped,
                dimension.unwrap_or_default()
            );
        }

        let expected = dimension.unwrap_or_default();
        if vector.len() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let mut results: Vec<SimilarityResult> = scored
            .into_iter()
            .map(|(chunk, stored)| SimilarityResult {
                similarity: cosine_similarity(vector, &stored),
                chunk,
            })
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);

        debug!("Query matched {} chunks", results.len());
        Ok(results)
    }

    /// Most recently stored chunks, newest first
    #[inline]
    pub async fn recent(&self, top_k: usize) -> Result<Vec<String>> {
        let _guard = self.lock.read().await;

        let limit = i64::try_from(top_k).unwrap_or(i64::MAX);
        EmbeddingQueries::list_recent(self.database.pool(), limit)
            .await
            .map_err(database_error)
    }

    /// Whether the store can answer queries for vectors of `kind`.
    /// A persisted vectorizer marks the rows as sparse, so dense queries never see them.
    #[inline]
    pub async fn is_ready(&self, kind: EmbeddingBackendKind) -> Result<bool> {
        let _guard = self.lock.read().await;

        let has_vectorizer = ModelStateQueries::get(self.database.pool())
            .await
            .map_err(database_error)?
            .is_some();

        match kind {
            EmbeddingBackendKind::Tfidf => Ok(has_vectorizer),
            EmbeddingBackendKind::Remote => {
                if has_vectorizer {
                    debug!("Stored vectors are TF-IDF, not ready for dense queries");
                    return Ok(false);
                }
                Ok(EmbeddingQueries::count(self.database.pool())
                    .await
                    .map_err(database_error)?
                    > 0)
            }
        }
    }

    #[inline]
    pub async fn count(&self) -> Result<i64> {
        let _guard = self.lock.read().await;

        EmbeddingQueries::count(self.database.pool())
            .await
            .map_err(database_error)
    }

    #[inline]
    pub async fn load_vectorizer(&self) -> Result<Option<TfidfVectorizer>> {
        let _guard = self.lock.read().await;

        let Some(state) = ModelStateQueries::get(self.database.pool())
            .await
            .map_err(database_error)?
        else {
            return Ok(None);
        };

        let vectorizer = serde_json::from_str(&state.vectorizer)
            .map_err(|e| RagError::Database(format!("Corrupt vectorizer state: {e}")))?;
        debug!("Loaded vectorizer saved at {}", state.last_updated);

        Ok(Some(vectorizer))
    }

    #[inline]
    pub async fn sample_chunk(&self) -> Result<Option<String>> {
        let _guard = self.lock.read().await;

        EmbeddingQueries::first_chunk(self.database.pool())
            .await
            .map_err(database_error)
    }
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero norm
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        (dot / (na * nb)).clamp(-1.0, 1.0)
    }
}
