//! Session configuration, file defaults and the persisted proxy setting.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command-line overrides applied by the binary.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::imaging::{MAIN_PREVIEW_WIDTH, THUMBNAIL_WIDTH};
use crate::navigation::DEFAULT_POOL_SIZE;
use crate::resolver::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_PANEL_SIZE, DEFAULT_READ_TIMEOUT,
    HttpSettings, RetryPolicy,
};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Default proxy persistence file.
pub const DEFAULT_PROXY_FILE: &str = "proxy.txt";

/// Errors loading or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config or proxy file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`FileConfig`].
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its allowed range.
    #[error("Invalid config value for `{field}`: {value}. Expected range: {expected}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Allowed range.
        expected: &'static str,
    },

    /// Proxy file could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Everything a session needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Root of the content cache.
    pub cache_dir: PathBuf,
    /// Directory saved images are written to.
    pub output_dir: PathBuf,
    /// Store cache entries byte-reversed.
    pub reverse_cache_bytes: bool,
    /// Optional `host:port` proxy.
    pub proxy: Option<String>,
    /// Connect deadline per request.
    pub connect_timeout: Duration,
    /// Read deadline per request.
    pub read_timeout: Duration,
    /// Attempts per resolution, including the first.
    pub max_attempts: u32,
    /// Concurrent background thumbnail tasks.
    pub pool_size: usize,
    /// Slots per related-thumbnail panel.
    pub panel_size: usize,
    /// Thumbnail width in pixels.
    pub thumbnail_width: u32,
    /// Main preview width in pixels.
    pub preview_width: u32,
    /// Send provider requests here instead of `https://{host}`.
    pub origin_override: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            output_dir: default_output_dir(),
            reverse_cache_bytes: true,
            proxy: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pool_size: DEFAULT_POOL_SIZE,
            panel_size: DEFAULT_PANEL_SIZE,
            thumbnail_width: THUMBNAIL_WIDTH,
            preview_width: MAIN_PREVIEW_WIDTH,
            origin_override: None,
        }
    }
}

impl SessionConfig {
    /// HTTP client settings.
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            proxy: self.proxy.clone(),
        }
    }

    /// Resolution retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts)
    }

    /// Overlays values present in `file`.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(dir) = &file.cache_dir {
            self.cache_dir.clone_from(dir);
        }
        if let Some(dir) = &file.output_dir {
            self.output_dir.clone_from(dir);
        }
        if let Some(reverse) = file.reverse_cache_bytes {
            self.reverse_cache_bytes = reverse;
        }
        if let Some(proxy) = &file.proxy {
            self.proxy = Some(proxy.clone());
        }
        if let Some(ms) = file.connect_timeout_ms {
            self.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.read_timeout_ms {
            self.read_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = file.max_attempts {
            self.max_attempts = attempts;
        }
        if let Some(size) = file.pool_size {
            self.pool_size = size;
        }
        if let Some(size) = file.panel_size {
            self.panel_size = size;
        }
    }
}

/// Today's date as `YYYY.MM.DD`.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    PathBuf::from(chrono::Local::now().format("%Y.%m.%d").to_string())
}

/// TOML-backed file configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Cache root.
    pub cache_dir: Option<PathBuf>,
    /// Output directory for saved images.
    pub output_dir: Option<PathBuf>,
    /// At-rest byte reversal for cache entries.
    pub reverse_cache_bytes: Option<bool>,
    /// Proxy `host:port`.
    pub proxy: Option<String>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Attempts per resolution.
    pub max_attempts: Option<u32>,
    /// Background pool size.
    pub pool_size: Option<usize>,
    /// Panel slot count.
    pub panel_size: Option<usize>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] with `path` for context.
    pub fn from_toml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range("connect_timeout_ms", self.connect_timeout_ms, 1, 600_000, "1..=600000")?;
        validate_range("read_timeout_ms", self.read_timeout_ms, 1, 600_000, "1..=600000")?;
        validate_range(
            "max_attempts",
            self.max_attempts.map(u64::from),
            1,
            20,
            "1..=20",
        )?;
        validate_range("pool_size", self.pool_size.map(as_u64), 1, 100, "1..=100")?;
        validate_range("panel_size", self.panel_size.map(as_u64), 1, 32, "1..=32")?;
        Ok(())
    }
}

fn as_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn validate_range(
    field: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            field,
            value,
            expected,
        });
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when the file exists.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/imgview/config.toml`
/// 2. `$HOME/.config/imgview/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("imgview")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("imgview")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Reads and validates a config file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = FileConfig::from_toml(&raw, path)?;
    config.validate()?;
    debug!(path = %path.display(), "config file loaded");
    Ok(config)
}

/// Loads config from `explicit` or the default path, if the file exists.
///
/// # Errors
///
/// Returns [`ConfigError`] for an existing file that fails to load, or for
/// an explicit path that does not exist.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(load_file_config(path)?),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(p) if p.exists() => Some(load_file_config(p)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Reads the last persisted proxy.
///
/// A missing or blank file yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] for IO failures other than "not found".
pub fn read_proxy_file(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let proxy = raw.trim();
            Ok((!proxy.is_empty()).then(|| proxy.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `proxy` as a single line. Blank values are not written.
///
/// # Errors
///
/// Returns [`ConfigError::Write`] if the file cannot be written.
pub fn write_proxy_file(path: &Path, proxy: &str) -> Result<(), ConfigError> {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return Ok(());
    }
    std::fs::write(path, proxy).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
