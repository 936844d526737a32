
use anyhow::{Context, Result};
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upper bound on the length of any chunk, in characters
pub const HARD_CHUNK_LIMIT: usize = 8000;

/// Sentence boundary: terminal punctuation followed by whitespace.
/// No look-around, so matching runs on the linear-time engine.
const SENTENCE_BOUNDARY: &str = r"[.!?]\s+";

/// Strategy used to split extracted text into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Greedily pack whole sentences up to `max_chunk_size` characters
    #[default]
    Sentence,
    /// Sliding window of words with overlap
    FixedSize,
}

impl std::fmt::Display for ChunkingStrategy {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            ChunkingStrategy::Sentence => write!(f, "Sentence-Based"),
            ChunkingStrategy::FixedSize => write!(f, "Fixed-Size"),
        }
    }
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategy,
    /// Approximate chunk size in characters for fixed-size chunking
    pub chunk_size: usize,
    /// Overlap in words between adjacent fixed-size windows
    pub overlap: usize,
    /// Maximum chunk length in characters for sentence chunking
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Sentence,
            chunk_size: 512,
            overlap: 50,
            max_chunk_size: HARD_CHUNK_LIMIT,
        }
    }
}

impl ChunkingConfig {
    /// Fixed-size window length in words (roughly four characters per word)
    #[inline]
    pub fn window_words(&self) -> usize {
        (self.chunk_size / 4).max(1)
    }

    /// Distance between fixed-size window starts, never below one word
    #[inline]
    pub fn step_words(&self) -> usize {
        self.window_words().saturating_sub(self.overlap).max(1)
    }
}

/// Chunk a single document's text with the configured strategy
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let chunks = match config.strategy {
        ChunkingStrategy::FixedSize => chunk_fixed_size(text, config.chunk_size, config.overlap),
        ChunkingStrategy::Sentence => chunk_by_sentences(text, config.max_chunk_size)?,
    };

    debug!(
        "Chunked {} characters into {} chunks using {} strategy",
        text.len(),
        chunks.len(),
        config.strategy
    );

    Ok(chunks)
}

/// Sliding window over whitespace-separated words
#[inline]
pub fn chunk_fixed_size(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let config = ChunkingConfig {
        strategy: ChunkingStrategy::FixedSize,
        chunk_size,
        overlap,
        ..ChunkingConfig::default()
    };
    let window = config.window_words();
    let step = config.step_words();

    if overlap >= window {
        warn!(
            "Overlap of {} words does not fit a {} word window, advancing one word at a time",
            overlap, window
        );
    }

    (0..words.len())
        .step_by(step)
        .map(|start| {
            let end = (start + window).min(words.len());
            let mut chunk = words[start..end].join(" ");
            truncate_chars(&mut chunk, HARD_CHUNK_LIMIT);
            chunk
        })
        .collect()
}

/// Greedy sentence packing; sentences longer than the limit are split on words
#[inline]
pub fn chunk_by_sentences(text: &str, max_chunk_size: usize) -> Result<Vec<String>> {
    let max_chunk_size = max_chunk_size.max(1);
    let boundary = Regex::new(SENTENCE_BOUNDARY).context("Invalid sentence boundary pattern")?;

    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_size = 0;

    for sentence in split_sentences(&boundary, text)? {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let sentence_size = sentence.chars().count();

        if sentence_size > max_chunk_size {
            flush(&mut chunks, &mut current);
            current_size = 0;
            chunks.extend(split_long_sentence(sentence, max_chunk_size));
        } else if current_size + sentence_size + 1 > max_chunk_size {
            flush(&mut chunks, &mut current);
            current.push(sentence);
            current_size = sentence_size;
        } else {
            current.push(sentence);
            current_size += sentence_size + 1;
        }
    }

    flush(&mut chunks, &mut current);

    Ok(chunks)
}

/// Split after each boundary's punctuation mark, dropping the whitespace run
fn split_sentences<'t>(boundary: &Regex, text: &'t str) -> Result<Vec<&'t str>> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for found in boundary.find_iter(text) {
        let found = found.context("Sentence boundary detection failed")?;
        // The punctuation class is ASCII, so start + 1 is a char boundary
        sentences.push(text.get(last..found.start() + 1).unwrap_or_default());
        last = found.end();
    }
    sentences.push(text.get(last..).unwrap_or_default());

    Ok(sentences)
}

/// Split an oversized sentence on word boundaries, hard-splitting oversized words
fn split_long_sentence(sentence: &str, max_chunk_size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = Vec::new();
    let mut current_size = 0;

    for word in sentence.split_whitespace() {
        let word_size = word.chars().count();

        if word_size > max_chunk_size {
            flush(&mut pieces, &mut current);
            current_size = 0;
            pieces.extend(split_chars(word, max_chunk_size));
        } else if current_size + word_size + 1 > max_chunk_size {
            flush(&mut pieces, &mut current);
            current.push(word);
            current_size = word_size;
        } else {
            current.push(word);
            current_size += word_size + 1;
        }
    }

    flush(&mut pieces, &mut current);

    pieces
}

fn split_chars(word: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(size)
        .map(|piece| piece.iter().collect())
        .collect()
}

fn flush(chunks: &mut Vec<String>, current: &mut Vec<&str>) {
    if !current.is_empty() {
        chunks.push(current.join(" "));
        current.clear();
    }
}

/// Truncate in place to at most `limit` characters
#[inline]
pub fn truncate_chars(text: &mut String, limit: usize) {
    if let Some((index, _)) = text.char_indices().nth(limit) {
        text.truncate(index);
    }
}
