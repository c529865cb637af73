//! Disk-backed, provider-namespaced content cache.
//!
//! Layout: `{root}/{namespace}/{key}`, one file per entry holding raw bytes.
//! The namespace is a provider's cache key and its directory is created on
//! first write. Entries are never evicted or expired; a written entry is
//! treated as authoritative until a caller explicitly bypasses the cache.
//!
//! # At-rest byte order
//!
//! A cache may store every entry byte-reversed. The setting applies to the
//! whole cache directory: reads undo exactly what writes did, so mixing
//! reversed and plain entries under one root corrupts reads. Reversal is
//! compatibility only, not protection.
//!
//! # Concurrency
//!
//! Writes go to a unique temporary file and are renamed into place, so
//! concurrent writers of the same key never expose a partial entry and the
//! last rename wins. Values for a key are identical regardless of writer.

mod error;

pub use error::CacheError;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, instrument, warn};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content cache rooted at a base directory.
#[derive(Debug, Clone)]
pub struct ContentCache {
    root: PathBuf,
    reverse_bytes: bool,
}

impl ContentCache {
    /// Creates a cache rooted at `root`.
    ///
    /// `reverse_bytes` selects the at-rest byte order for every entry.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, reverse_bytes: bool) -> Self {
        Self {
            root: root.into(),
            reverse_bytes,
        }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `(namespace, key)`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] if either part is not a plain file name.
    pub fn entry_path(&self, namespace: &str, key: &str) -> Result<PathBuf, CacheError> {
        validate_component("namespace", namespace)?;
        validate_component("key", key)?;
        Ok(self.root.join(namespace).join(key))
    }

    /// Reads an entry.
    ///
    /// Missing and empty entries are both `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] for invalid keys or read failures other than
    /// "not found".
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(namespace, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => {
                debug!(bytes = bytes.len(), "cache hit");
                Ok(Some(self.transform(bytes)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Writes an entry, creating the namespace directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] for invalid keys or write failures.
    #[instrument(level = "debug", skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn put(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(namespace, key)?;
        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(dir.clone(), e))?;

        let temp_path = dir.join(format!(
            ".{key}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let stored = self.transform(bytes.to_vec());
        if let Err(e) = tokio::fs::write(&temp_path, &stored).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::io(temp_path, e));
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::io(path, e));
        }

        debug!(path = %path.display(), "cache entry written");
        Ok(())
    }

    /// Reads an entry, treating any failure as a miss.
    pub async fn get_or_miss(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        match self.get(namespace, key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(namespace, key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Writes an entry, logging failures instead of returning them.
    pub async fn put_or_warn(&self, namespace: &str, key: &str, bytes: &[u8]) {
        if let Err(e) = self.put(namespace, key, bytes).await {
            warn!(namespace, key, error = %e, "cache write failed");
        }
    }

    fn transform(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        if self.reverse_bytes {
            bytes.reverse();
        }
        bytes
    }
}

fn validate_component(kind: &'static str, value: &str) -> Result<(), CacheError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
    {
        return Err(CacheError::invalid_key(kind, value));
    }
    Ok(())
}
