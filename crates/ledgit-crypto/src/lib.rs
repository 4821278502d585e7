//! Cryptographic primitives for ledgit.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 identities, and the
//! AES-256-GCM envelope used for private repository content, together with
//! the key derivation and key ring that decide who can open it.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod cipher;
pub mod error;
pub mod hasher;
pub mod identity;
pub mod keys;
pub mod signer;

pub use cipher::RepoCipher;
pub use error::CryptoError;
pub use hasher::{ContentHash, ContentHasher};
pub use identity::{Identity, LocalIdentity};
pub use keys::{KeyContext, KeyRing, RepoKey};
pub use signer::{Signature, SigningKey, VerifyingKey};
