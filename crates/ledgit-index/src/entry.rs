//! Hashed working-directory entries.

use std::path::PathBuf;

use ledgit_crypto::{ContentHash, ContentHasher, RepoKey};
use serde::{Deserialize, Serialize};

/// How local content is hashed.
///
/// Public repositories use the plain blob hash. Private repositories use a
/// keyed hash so the digests recorded in their trees reveal nothing to
/// someone without the repository key.
#[derive(Clone, Copy, Debug)]
pub enum HashMode<'a> {
    Plain,
    Keyed(&'a RepoKey),
}

impl HashMode<'_> {
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        match self {
            Self::Plain => ContentHasher::BLOB.hash(data),
            Self::Keyed(key) => ContentHasher::BLOB.keyed_hash(key, data),
        }
    }
}

/// A hashed file in the working directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Tree path, `/`-separated and relative to the scan root.
    pub path: String,
    /// Where the file lives on disk.
    pub abs_path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    pub hash: ContentHash,
}
