use ledgit_types::Address;

use crate::signer::{Signature, SigningKey, VerifyingKey};

/// The acting identity of a session.
///
/// Every ledger write is attested with a signature from this identity, and
/// private-repository keys are derived from its signatures.
pub trait Identity: Send + Sync {
    /// Stable public address.
    fn address(&self) -> Address;

    /// Sign an operation.
    fn sign(&self, message: &[u8]) -> Signature;
}

/// An identity backed by an in-process ed25519 key.
#[derive(Debug)]
pub struct LocalIdentity {
    key: SigningKey,
    address: Address,
}

impl LocalIdentity {
    pub fn new(key: SigningKey) -> Self {
        let address = key.verifying_key().to_address();
        Self { key, address }
    }

    pub fn generate() -> Self {
        Self::new(SigningKey::generate())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl Identity for LocalIdentity {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.key.sign(message)
    }
}
