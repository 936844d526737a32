mod stop_words;
#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use self::stop_words::ENGLISH_STOP_WORDS;
use super::EmbeddingBackend;
use crate::RagError;

pub const DEFAULT_MAX_FEATURES: usize = 100;

/// Sparse TF-IDF model: lowercased word tokens, English stop words removed,
/// vocabulary capped to the most frequent terms, smooth idf, L2-normalised rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_features: usize,
    /// Term to column index, columns in alphabetical order
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl Default for TfidfVectorizer {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FEATURES)
    }
}

impl TfidfVectorizer {
    #[inline]
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features: max_features.max(1),
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    /// Construct and fit in one step
    #[inline]
    pub fn fitted(max_features: usize, documents: &[&str]) -> crate::Result<Self> {
        let mut vectorizer = Self::new(max_features);
        vectorizer.fit(documents)?;
        Ok(vectorizer)
    }

    /// Learn vocabulary and idf weights, replacing any previous fit
    #[inline]
    pub fn fit(&mut self, documents: &[&str]) -> crate::Result<()> {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let mut seen = HashSet::new();
            for token in tokenize(document) {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.clone()) {
                    *document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(RagError::Embedding(
                "Empty vocabulary; the documents may only contain stop words".to_string(),
            ));
        }

        // Most frequent terms, ties broken alphabetically, then indexed alphabetically
        let terms: Vec<String> = term_counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .take(self.max_features)
            .map(|(term, _)| term)
            .sorted()
            .collect();

        let document_count = documents.len() as f64;
        self.idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                (((1.0 + document_count) / (1.0 + df)).ln() + 1.0) as f32
            })
            .collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();

        debug!(
            "Fitted TF-IDF vectorizer on {} documents with {} features",
            documents.len(),
            self.vocabulary.len()
        );

        Ok(())
    }

    #[inline]
    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    #[inline]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    #[inline]
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Terms in column order
    #[inline]
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> = self
            .vocabulary
            .iter()
            .map(|(term, &index)| (term.as_str(), index))
            .collect();
        names.sort_by_key(|&(_, index)| index);
        names.into_iter().map(|(term, _)| term).collect()
    }

    /// Vectorize a single text against the fitted vocabulary
    #[inline]
    pub fn transform(&self, text: &str) -> crate::Result<Vec<f32>> {
        if !self.is_fitted() {
            return Err(RagError::Embedding(
                "TF-IDF vectorizer has not been fitted".to_string(),
            ));
        }

        let mut row = vec![0.0_f64; self.vocabulary.len()];
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                row[index] += 1.0;
            }
        }

        for (value, &idf) in row.iter_mut().zip(&self.idf) {
            *value *= f64::from(idf);
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }

        Ok(row.into_iter().map(|v| v as f32).collect())
    }
}

impl EmbeddingBackend for TfidfVectorizer {
    #[inline]
    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.transform(text)).collect()
    }
}

/// Lowercased runs of two or more word characters, minus stop words
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| ENGLISH_STOP_WORDS.binary_search(token).is_err())
        .map(str::to_string)
        .collect()
}
