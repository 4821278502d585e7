use ledgit_store::StoreError;

/// Errors from the row model.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid branch name {name:?}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("invalid repository name {name:?}: {reason}")]
    InvalidRepoName { name: String, reason: String },

    #[error("malformed tree manifest: {0}")]
    MalformedTree(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for row model operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
