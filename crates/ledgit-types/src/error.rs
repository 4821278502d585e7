use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),
}
