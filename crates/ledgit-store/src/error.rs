use ledgit_types::{ContentId, TableId};

/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The table has not been created.
    #[error("table not found: {0}")]
    TableNotFound(TableId),

    /// A table with this id was already created.
    #[error("table already exists: {0}")]
    AlreadyExists(String),

    /// No content was ever stored under this id.
    #[error("content not found: {0}")]
    ContentNotFound(ContentId),

    /// The row's attestation does not verify against its author.
    #[error("invalid attestation on write to {table}: {reason}")]
    InvalidAttestation { table: TableId, reason: String },

    /// A transient failure the caller may retry.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored file could not be decoded.
    #[error("corrupt entry {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
