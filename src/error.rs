//! Error types for Quarry
//!
//! All modules use `QuarryResult<T>` as their return type.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for Quarry operations
pub type QuarryResult<T> = Result<T, QuarryError>;

/// All errors that can occur in Quarry
#[derive(Error, Debug)]
pub enum QuarryError {
    // Backend errors
    #[error("unknown revision {rev} in {module}")]
    UnknownRevision { module: String, rev: String },

    #[error("{module}: {reason}")]
    Vcs { module: String, reason: String },

    // Download errors
    #[error("zip for {module} has unexpected file {entry}")]
    ZipShape { module: String, entry: String },

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // Configuration errors
    #[error("invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("no cache root configured")]
    NoCacheRoot,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // A failure replayed from the per-process memoization cache
    #[error("{0}")]
    Shared(Arc<QuarryError>),
}

impl QuarryError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a VCS backend error
    pub fn vcs(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Vcs {
            module: module.into(),
            reason: reason.into(),
        }
    }
}
