use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Opaque reference to content held by the ledger.
///
/// The ledger hands one out per `store_content` call. Two uploads of the same
/// bytes produce two different ids, so equality of ids means "same upload",
/// never merely "same bytes".
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for display.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Deterministic identifier of a logical table.
///
/// Derived from a namespace root and the table name, so every client that
/// agrees on the root computes the same id without coordination.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId([u8; 32]);

impl TableId {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.short_hex())
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identifier for issues, pull requests, comments and reactions.
///
/// UUID v7, so ids sort roughly by creation time. Users refer to records by
/// a hex prefix, which is why [`RecordId::matches_prefix`] ignores dashes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex characters.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }

    /// Whether `prefix` (dashes optional, case-insensitive) starts this id.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let wanted: String = prefix
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        !wanted.is_empty() && self.0.simple().to_string().starts_with(&wanted)
    }
}

impl FromStr for RecordId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| TypeError::InvalidRecordId(s.to_string()))
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.short())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_short_and_display() {
        let id = ContentId::new("5VfYtq2Lmx9kQ7wz");
        assert_eq!(id.short(), "5VfYtq2L");
        assert_eq!(id.to_string(), "5VfYtq2Lmx9kQ7wz");
        assert_eq!(ContentId::new("abc").short(), "abc");
    }

    #[test]
    fn content_id_serializes_as_plain_string() {
        let id = ContentId::new("tx-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tx-1\"");
    }

    #[test]
    fn table_id_hex_roundtrip() {
        let id = TableId::from_hash([7u8; 32]);
        let parsed = TableId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn table_id_rejects_wrong_length() {
        let err = TableId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
        assert!(TableId::from_hex("zz").is_err());
    }

    #[test]
    fn record_ids_are_unique_and_ordered() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn record_id_prefix_matching() {
        let id: RecordId = "0190f3a2-1b2c-7d4e-8f00-123456789abc".parse().unwrap();
        assert!(id.matches_prefix("0190f3a2"));
        assert!(id.matches_prefix("0190F3A2-1B2C"));
        assert!(id.matches_prefix("0190f3a21b2c"));
        assert!(!id.matches_prefix("0190f3a3"));
        assert!(!id.matches_prefix(""));
        assert_eq!(id.short(), "0190f3a2");
    }

    #[test]
    fn record_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<RecordId>().is_err());
    }
}
