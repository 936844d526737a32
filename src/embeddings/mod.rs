// Embeddings module
// Turns chunk text into vectors with either a local TF-IDF model or a remote embedding API

pub mod chunking;
pub mod remote;
pub mod tfidf;


use serde::{Deserialize, Serialize};

pub use chunking::{ChunkingConfig, ChunkingStrategy, chunk_text};
pub use remote::RemoteEmbeddingClient;
pub use tfidf::TfidfVectorizer;

/// Which backend produced (or will produce) the stored vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    /// Local sparse TF-IDF vectors
    Tfidf,
    /// Dense vectors from a remote embedding service
    #[default]
    Remote,
}

impl std::fmt::Display for EmbeddingBackendKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            EmbeddingBackendKind::Tfidf => write!(f, "TF-IDF"),
            EmbeddingBackendKind::Remote => write!(f, "Remote API"),
        }
    }
}

/// Maps texts to vectors, one per input, in input order
pub trait EmbeddingBackend {
    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;
}

/// Closed set of embedding backends
#[derive(Debug, Clone)]
pub enum Embedder {
    Sparse(TfidfVectorizer),
    Dense(RemoteEmbeddingClient),
}

impl Embedder {
    #[inline]
    pub fn kind(&self) -> EmbeddingBackendKind {
        match *self {
            Embedder::Sparse(_) => EmbeddingBackendKind::Tfidf,
            Embedder::Dense(_) => EmbeddingBackendKind::Remote,
        }
    }

    /// The fitted vectorizer that must be persisted next to its vectors
    #[inline]
    pub fn vectorizer(&self) -> Option<&TfidfVectorizer> {
        match *self {
            Embedder::Sparse(ref vectorizer) => Some(vectorizer),
            Embedder::Dense(_) => None,
        }
    }
}

impl EmbeddingBackend for Embedder {
    #[inline]
    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        match *self {
            Embedder::Sparse(ref vectorizer) => vectorizer.embed(texts),
            Embedder::Dense(ref client) => client.embed(texts),
        }
    }
}
