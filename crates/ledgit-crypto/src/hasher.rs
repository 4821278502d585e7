use std::fmt;

use ledgit_types::TableId;
use serde::{Deserialize, Serialize};

use crate::keys::RepoKey;

/// Hex-encoded 32-byte digest of file content, as recorded in tree entries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Wrap a hash string read from a tree manifest.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.len().min(12);
        write!(f, "ContentHash({})", self.0.get(..end).unwrap_or(&self.0))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"ledgit-blob-v1"`) that is
/// prepended to every hash computation. A blob and a table name with
/// identical bytes therefore never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for file content.
    pub const BLOB: Self = Self {
        domain: "ledgit-blob-v1",
    };
    /// Hasher for table id derivation.
    pub const TABLE: Self = Self {
        domain: "ledgit-table-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        ContentHash::from_digest(&self.digest(data))
    }

    /// Hash with a repository key.
    ///
    /// Private repositories record keyed hashes so that the tree manifest,
    /// which is stored in the clear, does not let anyone confirm a guess
    /// about file contents.
    pub fn keyed_hash(&self, key: &RepoKey, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new_keyed(key.as_bytes());
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentHash::from_digest(hasher.finalize().as_bytes())
    }

    /// Deterministic table id for `name` under the namespace `root`.
    pub fn table_id(root: &str, name: &str) -> TableId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(Self::TABLE.domain.as_bytes());
        hasher.update(b":");
        hasher.update(root.as_bytes());
        hasher.update(b"/");
        hasher.update(name.as_bytes());
        TableId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn digest(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::BLOB.hash(data), ContentHasher::BLOB.hash(data));
        assert_eq!(ContentHasher::BLOB.hash(data).as_str().len(), 64);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let custom = ContentHasher::new("ledgit-other-v1");
        assert_ne!(ContentHasher::BLOB.hash(data), custom.hash(data));
    }

    #[test]
    fn keyed_hash_differs_from_plain_and_between_keys() {
        let data = b"<h1>hi</h1>";
        let k1 = RepoKey::from_bytes([1u8; 32]);
        let k2 = RepoKey::from_bytes([2u8; 32]);
        let plain = ContentHasher::BLOB.hash(data);
        let keyed1 = ContentHasher::BLOB.keyed_hash(&k1, data);
        assert_ne!(plain, keyed1);
        assert_ne!(keyed1, ContentHasher::BLOB.keyed_hash(&k2, data));
        assert_eq!(keyed1, ContentHasher::BLOB.keyed_hash(&k1, data));
    }

    #[test]
    fn verify_correct_and_tampered_data() {
        let hash = ContentHasher::BLOB.hash(b"original");
        assert!(ContentHasher::BLOB.verify(b"original", &hash));
        assert!(!ContentHasher::BLOB.verify(b"tampered", &hash));
    }

    #[test]
    fn table_ids_depend_on_root_and_name() {
        let a = ContentHasher::table_id("ledgit-v1", "repos");
        assert_eq!(a, ContentHasher::table_id("ledgit-v1", "repos"));
        assert_ne!(a, ContentHasher::table_id("ledgit-v1", "commits"));
        assert_ne!(a, ContentHasher::table_id("ledgit-v2", "repos"));
        assert_ne!(
            ContentHasher::table_id("ledgit", "v1repos"),
            ContentHasher::table_id("ledgit-v1", "repos")
        );
    }
}
