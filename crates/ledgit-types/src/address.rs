use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Public address of an identity: the lowercase hex encoding of its
/// 32-byte ed25519 verifying key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn from_key_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Wrap an address string without validating it.
    ///
    /// Rows read from the ledger may carry addresses from other clients, so
    /// parsing them must never fail.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the 32 key bytes, if this is a well-formed address.
    pub fn key_bytes(&self) -> Result<[u8; 32], TypeError> {
        let bytes = hex::decode(&self.0).map_err(|_| TypeError::InvalidAddress(self.0.clone()))?;
        bytes
            .try_into()
            .map_err(|_| TypeError::InvalidAddress(self.0.clone()))
    }

    /// `abcd…wxyz` form for listings.
    pub fn short(&self) -> String {
        if self.0.len() <= 10 || !self.0.is_ascii() {
            return self.0.clone();
        }
        format!("{}…{}", &self.0[..4], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = Self(s.trim().to_ascii_lowercase());
        addr.key_bytes()?;
        Ok(addr)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
