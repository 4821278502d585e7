//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that can occur while scanning or hashing a working directory.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The scan root does not exist or is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An ignore pattern could not be compiled.
    #[error("invalid ignore pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Reading a file failed.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
