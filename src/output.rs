//! Saving original images into the output directory.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Highest collision suffix tried before giving up.
const MAX_SUFFIX: u32 = 9999;

/// Errors writing an image to disk.
#[derive(Debug, Error)]
pub enum OutputError {
    /// File system error.
    #[error("cannot write {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Every suffixed name up to `_9999` is taken.
    #[error("no free file name for '{name}' in {dir}")]
    Exhausted {
        /// Base name.
        name: String,
        /// Output directory.
        dir: PathBuf,
    },
}

/// Replaces characters that cannot appear in a file name.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

/// Candidate file name for collision round `round` (0 is the bare name).
#[must_use]
pub fn candidate_name(name: &str, round: u32) -> String {
    if round == 0 {
        name.to_string()
    } else {
        format!("{name}_{round:04}")
    }
}

/// Writes `bytes` to `dir/name`, or `dir/name_0001`, `dir/name_0002`, ...
/// when earlier names exist. Creates `dir` if needed.
///
/// # Errors
///
/// Returns [`OutputError`] if the directory or file cannot be written.
pub fn save_image(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let name = sanitize_filename(name);

    for round in 0..=MAX_SUFFIX {
        let path = dir.join(candidate_name(&name, round));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "name taken");
                continue;
            }
            Err(source) => return Err(OutputError::Io { path, source }),
        };
        file.write_all(bytes)
            .map_err(|source| OutputError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), bytes = bytes.len(), "image saved");
        return Ok(path);
    }

    Err(OutputError::Exhausted {
        name,
        dir: dir.to_path_buf(),
    })
}
