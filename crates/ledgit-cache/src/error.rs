use std::path::PathBuf;

/// Errors from the durable cache tier.
///
/// None of these reach engine callers: a failing disk tier degrades to a
/// cache miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache entry {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("cache encoding error: {0}")]
    Encoding(String),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
