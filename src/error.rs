//! Error types returned by this crate.

use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error kinds the core build engine must distinguish, see the crate's
/// design notes on error propagation: every error surfaces to the driver,
/// which prints a diagnostic and exits non-zero.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid manifest configuration: {0}")]
    ConfigInvalid(String),

    #[error("failed to fetch source {url}: {message}")]
    SourceFetch { url: String, message: String },

    #[error("digest mismatch for {file}: expected {expected}, found {found}")]
    DigestMismatch { file: String, expected: String, found: String },

    #[error("{0}")]
    NotFound(String),

    #[error("`{tool}` exited with status {code}")]
    SubprocessFailed { tool: String, code: i32 },

    #[error("cache I/O error: {0}")]
    CacheIo(String),

    #[error("build cancelled")]
    Cancelled,

    #[error("{path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl Error {
    /// Wraps an [`std::io::Error`] together with the path that caused it.
    pub fn io(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
