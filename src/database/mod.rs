// Database module
// SQLite persistence for chunks, their vectors, and the fitted vectorizer

pub mod sqlite;
pub mod vector_store;

pub use sqlite::*;
pub use vector_store::{SimilarityResult, VectorStore, cosine_similarity};
