use std::path::PathBuf;

use ledgit_crypto::CryptoError;
use ledgit_gate::GateError;
use ledgit_index::IndexError;
use ledgit_ledger::LedgerError;
use ledgit_store::{PaymentError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Access(#[from] GateError),

    #[error("no key available for private repository {repo:?}")]
    KeyUnavailable { repo: String },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("upload of {name:?} failed: {reason}")]
    Upload { name: String, reason: String },

    #[error("cannot decrypt {id}: {reason}")]
    Decryption { id: String, reason: String },

    #[error("content {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("payment failed: {0}")]
    Payment(#[from] PaymentError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("working directory error: {0}")]
    Index(#[from] IndexError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`SdkError`], for callers that branch on the
/// kind of failure rather than its details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    Upload,
    Decryption,
    Payment,
    Storage,
    Io,
    Config,
}

impl SdkError {
    pub(crate) fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::PermissionDenied(_) | Self::Access(_) | Self::KeyUnavailable { .. } => {
                ErrorKind::Permission
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Upload { .. } => ErrorKind::Upload,
            Self::Decryption { .. } => ErrorKind::Decryption,
            Self::Payment(_) => ErrorKind::Payment,
            Self::Store(StoreError::ContentNotFound(_) | StoreError::TableNotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Store(StoreError::Io(_)) => ErrorKind::Io,
            Self::Ledger(
                LedgerError::InvalidBranchName { .. } | LedgerError::InvalidRepoName { .. },
            ) => ErrorKind::Validation,
            Self::Ledger(LedgerError::Store(StoreError::ContentNotFound(_))) => {
                ErrorKind::NotFound
            }
            Self::Index(IndexError::NotADirectory(_)) | Self::Io { .. } => ErrorKind::Io,
            Self::Index(IndexError::Io { .. }) => ErrorKind::Io,
            Self::Index(IndexError::InvalidPattern { .. }) | Self::Config(_) => ErrorKind::Config,
            Self::Crypto(CryptoError::Decryption) => ErrorKind::Decryption,
            Self::Corrupt { .. } | Self::Store(_) | Self::Ledger(_) | Self::Crypto(_) => {
                ErrorKind::Storage
            }
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ledgit_gate::Action;
    use ledgit_types::{Address, ContentId};

    #[test]
    fn kinds() {
        assert_eq!(SdkError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(
            SdkError::not_found("commit", "0190abcd").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SdkError::Store(StoreError::ContentNotFound(ContentId::new("c"))).kind(),
            ErrorKind::NotFound
        );
        let denied = GateError::PermissionDenied {
            actor: Address::new_unchecked("aa"),
            action: Action::Write,
            repo: "demo".into(),
            reason: "not a collaborator".into(),
        };
        assert_eq!(SdkError::from(denied).kind(), ErrorKind::Permission);
        assert_eq!(
            SdkError::from(LedgerError::InvalidBranchName {
                name: "a..b".into(),
                reason: "r".into()
            })
            .kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn messages_name_the_subject() {
        let err = SdkError::not_found("commit", "0190abcd");
        assert_eq!(err.to_string(), "commit not found: 0190abcd");
        let err = SdkError::Upload {
            name: "index.html".into(),
            reason: "timeout".into(),
        };
        assert!(err.to_string().contains("\"index.html\""));
        let err = SdkError::KeyUnavailable {
            repo: "secret".into(),
        };
        assert!(err.to_string().contains("\"secret\""));
    }
}
