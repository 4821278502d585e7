use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use ledgit_types::Address;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::identity::Identity;

const KEY_DERIVATION_CONTEXT: &str = "ledgit private repository key v1";

/// Which key encrypts a repository's content.
///
/// Normally the repository's own owner and name. A fork of a private
/// repository keeps its source's context, so the shared tree stays readable
/// by whoever holds the source key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyContext {
    pub owner: Address,
    pub repo: String,
}

impl KeyContext {
    pub fn new(owner: Address, repo: impl Into<String>) -> Self {
        Self {
            owner,
            repo: repo.into(),
        }
    }

    /// The message the owner signs to derive this context's key.
    fn label(&self) -> String {
        format!("ledgit:repo-key:v1:{}:{}", self.owner, self.repo)
    }
}

impl fmt::Display for KeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner.short(), self.repo)
    }
}

/// 256-bit symmetric key for one repository.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RepoKey([u8; 32]);

impl RepoKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the key for `ctx`. Only the context's owner can do this.
    ///
    /// Ed25519 signatures are deterministic, so the owner's signature over
    /// the context label is a stable secret that nobody else can produce.
    pub fn derive(identity: &dyn Identity, ctx: &KeyContext) -> Option<Self> {
        if identity.address() != ctx.owner {
            return None;
        }
        let signature = identity.sign(ctx.label().as_bytes());
        Some(Self(blake3::derive_key(
            KEY_DERIVATION_CONTEXT,
            &signature.to_bytes(),
        )))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex form for out-of-band sharing with collaborators.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoKey(<redacted>)")
    }
}

/// Keys a session can use, by context.
///
/// Keys the session identity owns are derived on first use and remembered.
/// Keys for other owners' repositories only exist here if they were
/// imported.
#[derive(Default)]
pub struct KeyRing {
    keys: RwLock<HashMap<KeyContext, RepoKey>>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key for `ctx`, deriving it when `identity` owns the context.
    pub fn resolve(&self, identity: &dyn Identity, ctx: &KeyContext) -> Option<RepoKey> {
        if let Some(key) = self.keys.read().expect("lock poisoned").get(ctx) {
            return Some(key.clone());
        }
        let key = RepoKey::derive(identity, ctx)?;
        self.keys
            .write()
            .expect("lock poisoned")
            .insert(ctx.clone(), key.clone());
        Some(key)
    }

    /// Add a key received from the repository owner.
    pub fn import(&self, ctx: KeyContext, key: RepoKey) {
        self.keys.write().expect("lock poisoned").insert(ctx, key);
    }

    pub fn contains(&self, ctx: &KeyContext) -> bool {
        self.keys.read().expect("lock poisoned").contains_key(ctx)
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.keys.read().map(|k| k.len()).unwrap_or(0);
        f.debug_struct("KeyRing").field("keys", &count).finish()
    }
}
