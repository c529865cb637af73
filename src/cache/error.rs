//! Error types for the content cache.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing cached entries.
#[derive(Debug, Error)]
pub enum CacheError {
    /// File system error on a cache path.
    #[error("cache IO error at {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Namespace or key cannot be used as a file name.
    #[error("invalid cache {kind} '{value}'")]
    InvalidKey {
        /// Either "namespace" or "key".
        kind: &'static str,
        /// Rejected value.
        value: String,
    },
}

impl CacheError {
    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-key error.
    pub fn invalid_key(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidKey {
            kind,
            value: value.into(),
        }
    }
}
