
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_CACHE_CAPACITY: usize = 128;
pub const HISTORY_PREVIEW_LEN: usize = 5;

/// LRU cache of generated responses keyed by model and prompt
#[derive(Debug)]
pub struct ResponseCache {
    entries: LruCache<(String, String), String>,
}

/// One cached response as written to the session file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedResponse {
    model: String,
    prompt: String,
    response: String,
}

impl Default for ResponseCache {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResponseCache {
    /// A capacity of zero is treated as one
    #[inline]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    #[inline]
    pub fn get(&mut self, model: &str, prompt: &str) -> Option<String> {
        let hit = self
            .entries
            .get(&(model.to_string(), prompt.to_string()))
            .cloned();
        if hit.is_some() {
            debug!("Response cache hit for model {}", model);
        }
        hit
    }

    #[inline]
    pub fn insert(&mut self, model: &str, prompt: &str, response: String) {
        self.entries
            .put((model.to_string(), prompt.to_string()), response);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries from least to most recently used
    fn snapshot(&self) -> Vec<CachedResponse> {
        self.entries
            .iter()
            .rev()
            .map(|((model, prompt), response)| CachedResponse {
                model: model.clone(),
                prompt: prompt.clone(),
                response: response.clone(),
            })
            .collect()
    }

    /// Replaying a snapshot oldest first restores the recency order
    fn restore(&mut self, snapshot: Vec<CachedResponse>) {
        for entry in snapshot {
            self.entries.put((entry.model, entry.prompt), entry.response);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub result: String,
}

/// On-disk form of a session
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    id: Uuid,
    history: Vec<HistoryEntry>,
    processed_files: Vec<String>,
    documents_processed: bool,
    #[serde(default)]
    cache: Vec<CachedResponse>,
}

/// State carried across the actions of one user session
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    history: Vec<HistoryEntry>,
    processed_files: Vec<String>,
    documents_processed: bool,
    cache: ResponseCache,
}

impl Default for Session {
    #[inline]
    fn default() -> Self {
        Self::new(ResponseCache::default())
    }
}

impl Session {
    #[inline]
    pub fn new(cache: ResponseCache) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            processed_files: Vec::new(),
            documents_processed: false,
            cache,
        }
    }

    /// Resume the session saved at `path`, or start a fresh one if there is none
    #[inline]
    pub fn load_or_new(path: &Path, mut cache: ResponseCache) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(cache));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let record: SessionRecord = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

        cache.restore(record.cache);
        debug!(
            "Resumed session {} with {} history entries and {} cached responses",
            record.id,
            record.history.len(),
            cache.len()
        );

        Ok(Self {
            id: record.id,
            history: record.history,
            processed_files: record.processed_files,
            documents_processed: record.documents_processed,
            cache,
        })
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let record = SessionRecord {
            id: self.id,
            history: self.history.clone(),
            processed_files: self.processed_files.clone(),
            documents_processed: self.documents_processed,
            cache: self.cache.snapshot(),
        };
        let content =
            serde_json::to_string_pretty(&record).context("Failed to serialize session")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write session file: {}", path.display()))
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn record<T: Into<String>, R: Into<String>>(&mut self, task: T, result: R) {
        self.history.push(HistoryEntry {
            timestamp: Utc::now(),
            task: task.into(),
            result: result.into(),
        });
    }

    /// Full history, oldest first
    #[inline]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The most recent entries, newest first
    #[inline]
    pub fn recent_history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().rev().take(HISTORY_PREVIEW_LEN)
    }

    #[inline]
    pub fn mark_processed(&mut self, files: Vec<String>) {
        self.processed_files = files;
        self.documents_processed = true;
    }

    #[inline]
    pub fn processed_files(&self) -> &[String] {
        &self.processed_files
    }

    #[inline]
    pub fn documents_processed(&self) -> bool {
        self.documents_processed
    }

    #[inline]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    #[inline]
    pub fn cache_mut(&mut self) -> &mut ResponseCache {
        &mut self.cache
    }
}
