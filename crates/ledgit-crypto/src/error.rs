use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key")]
    InvalidKey,

    #[error("encryption failed")]
    Encryption,

    /// Wrong key, truncated envelope, or tampered ciphertext. Deliberately
    /// carries no detail.
    #[error("decryption failed")]
    Decryption,
}
