//! Configuration for the cache and integrity layer
//!
//! Knobs are set once at startup and passed by reference thereafter.

use crate::error::{QuarryError, QuarryResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Process-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the on-disk module cache; disk caching is disabled when unset
    pub cache_root: Option<PathBuf>,

    /// Path to the project lockfile (`<project>.sum`); integrity checking is
    /// disabled when unset
    pub sum_file: Option<PathBuf>,

    /// Suppress progress notices on stderr
    pub quiet: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load(path: &Path) -> QuarryResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| QuarryError::io(format!("reading config from {}", path.display()), e))?;

        debug!("loaded configuration from {}", path.display());
        toml::from_str(&content).map_err(|e| QuarryError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Default cache root under the user cache directory
    pub fn default_cache_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quarry")
            .join("mod")
    }
}
