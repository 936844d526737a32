
use std::sync::Arc;
use tracing::debug;

use crate::database::{SimilarityResult, VectorStore};
use crate::embeddings::{
    Embedder, EmbeddingBackend, EmbeddingBackendKind, RemoteEmbeddingClient,
};
use crate::{RagError, Result};

/// Finds the stored chunks most similar to a query
#[derive(Debug, Clone)]
pub struct Retriever {
    store: Arc<VectorStore>,
    backend: EmbeddingBackendKind,
    remote: Option<RemoteEmbeddingClient>,
}

impl Retriever {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        backend: EmbeddingBackendKind,
        remote: Option<RemoteEmbeddingClient>,
    ) -> Self {
        Self {
            store,
            backend,
            remote,
        }
    }

    #[inline]
    pub fn backend(&self) -> EmbeddingBackendKind {
        self.backend
    }

    /// Top-K chunks for `query`; a blank query returns the newest chunks with similarity 1.0
    #[inline]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SimilarityResult>> {
        if !self.store.is_ready(self.backend).await? {
            return Err(RagError::StoreNotInitialized);
        }

        if query.trim().is_empty() {
            debug!("Blank query, returning {} most recent chunks", top_k);
            let recent = self.store.recent(top_k).await?;
            return Ok(recent
                .into_iter()
                .map(|chunk| SimilarityResult {
                    chunk,
                    similarity: 1.0,
                })
                .collect());
        }

        let embedder = self.query_embedder().await?;
        let mut vectors = embedder.embed(&[query.to_string()])?;
        let vector = vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("No embedding returned for query".to_string()))?;

        self.store.query(&vector, top_k).await
    }

    /// The embedder matching the backend that populated the store
    async fn query_embedder(&self) -> Result<Embedder> {
        match self.backend {
            EmbeddingBackendKind::Tfidf => self
                .store
                .load_vectorizer()
                .await?
                .map(Embedder::Sparse)
                .ok_or(RagError::StoreNotInitialized),
            EmbeddingBackendKind::Remote => self
                .remote
                .clone()
                .map(Embedder::Dense)
                .ok_or_else(|| {
                    RagError::Embedding("Remote embedding backend is not configured".to_string())
                }),
        }
    }
}
