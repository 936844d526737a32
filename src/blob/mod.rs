#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::extractor::DocumentKind;
use crate::{RagError, Result};

/// Key/value storage for source documents; keys use `/` separators
pub trait BlobStore {
    /// All keys starting with `prefix`, sorted
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
    fn get(&self, key: &str) -> Result<Vec<u8>>;
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}

/// Keys under `prefix` whose extension is a supported document format
#[inline]
pub fn list_documents<B: BlobStore + ?Sized>(store: &B, prefix: &str) -> Result<Vec<String>> {
    Ok(store
        .list(prefix)?
        .into_iter()
        .filter(|key| DocumentKind::from_key(key).is_ok())
        .collect())
}

/// Blob store mapping keys to files below a root directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('\\') {
            return Err(RagError::Blob(format!("Invalid key: {key:?}")));
        }

        let relative = Path::new(key);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(RagError::Blob(format!("Key escapes the store root: {key}")));
        }

        Ok(self.root.join(relative))
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.collect_keys(&path, keys)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                let key = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .join("/");
                keys.push(key);
            }
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    #[inline]
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        self.collect_keys(&self.root, &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();

        debug!("Listed {} blobs under prefix {:?}", keys.len(), prefix);
        Ok(keys)
    }

    #[inline]
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.key_path(key)?;
        fs::read(&path).map_err(|e| RagError::Blob(format!("Failed to read {key}: {e}")))
    }

    #[inline]
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, bytes).map_err(|e| RagError::Blob(format!("Failed to write {key}: {e}")))?;
        debug!(
            "Stored {} bytes at {} ({})",
            bytes.len(),
            key,
            content_type
        );
        Ok(())
    }
}
