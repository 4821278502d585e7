use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use ledgit_crypto::ContentHash;
use ledgit_types::ContentId;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Where one file's content lives and what it hashes to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    #[serde(alias = "txId")]
    pub content_id: ContentId,
    #[serde(alias = "hash")]
    pub content_hash: ContentHash,
}

/// A repository snapshot: repository-relative path → content.
///
/// Stored as a JSON object keyed by path. Paths use `/` separators and never
/// start with `/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree {
    entries: BTreeMap<String, TreeEntry>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::MalformedTree(e.to_string()))
    }

    pub fn to_json(&self) -> LedgerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: TreeEntry) -> Option<TreeEntry> {
        self.entries.insert(path.into(), entry)
    }

    pub fn remove(&mut self, path: &str) -> Option<TreeEntry> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Path → hash view, for status and diff.
    pub fn hashes(&self) -> BTreeMap<String, ContentHash> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.content_hash.clone()))
            .collect()
    }
}

/// Canonical tree path for a relative filesystem path.
pub fn tree_path(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Filesystem location of a tree path under `root`.
///
/// Returns `None` for paths that would escape `root` (absolute paths, `..`
/// components), which a manifest written by another client may contain.
pub fn checkout_path(root: &Path, path: &str) -> Option<PathBuf> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return None;
    }
    let mut out = root.to_path_buf();
    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            p if p.contains(':') => return None,
            p => out.push(p),
        }
    }
    (out != root).then_some(out)
}
