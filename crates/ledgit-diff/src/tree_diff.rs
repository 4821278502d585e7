//! Tree-level diff: compare two file trees and list the changed paths.
//!
//! Entries are compared by content hash. An added path whose hash equals a
//! deleted path's hash is reported as a rename.

use std::collections::HashSet;

use ledgit_crypto::ContentHash;
use ledgit_ledger::{FileTree, TreeEntry};
use ledgit_types::ContentId;
use serde::{Deserialize, Serialize};

/// The result of comparing two trees.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    pub changes: Vec<TreeChange>,
}

impl TreeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Paths touched on the new side (added, modified, or rename targets).
    pub fn new_paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().filter_map(|c| match c {
            TreeChange::Added { path, .. } | TreeChange::Modified { path, .. } => {
                Some(path.as_str())
            }
            TreeChange::Renamed { new_path, .. } => Some(new_path.as_str()),
            TreeChange::Deleted { .. } => None,
        })
    }
}

/// A single change between two trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TreeChange {
    Added {
        path: String,
        new_id: ContentId,
    },
    Deleted {
        path: String,
        old_id: ContentId,
    },
    /// Same path, different content hash.
    Modified {
        path: String,
        old_id: ContentId,
        new_id: ContentId,
    },
    /// Same content hash moved to a new path.
    Renamed {
        old_path: String,
        new_path: String,
        hash: ContentHash,
    },
}

impl TreeChange {
    /// The path this change is listed under.
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Deleted { path, .. } | Self::Modified { path, .. } => {
                path
            }
            Self::Renamed { new_path, .. } => new_path,
        }
    }
}

/// Compare two trees. `old` of `None` is the empty tree.
pub fn diff_trees(old: Option<&FileTree>, new: &FileTree) -> TreeDiff {
    let empty = FileTree::new();
    let old = old.unwrap_or(&empty);

    let mut changes = Vec::new();
    let mut deleted: Vec<(&String, &TreeEntry)> = Vec::new();
    let mut added: Vec<(&String, &TreeEntry)> = Vec::new();

    for (path, old_entry) in old.iter() {
        match new.get(path) {
            Some(new_entry) if new_entry.content_hash != old_entry.content_hash => {
                changes.push(TreeChange::Modified {
                    path: path.clone(),
                    old_id: old_entry.content_id.clone(),
                    new_id: new_entry.content_id.clone(),
                });
            }
            Some(_) => {}
            None => deleted.push((path, old_entry)),
        }
    }
    for (path, new_entry) in new.iter() {
        if !old.contains(path) {
            added.push((path, new_entry));
        }
    }

    let mut matched_deletes = HashSet::new();
    let mut matched_adds = HashSet::new();
    for (di, (del_path, del_entry)) in deleted.iter().enumerate() {
        for (ai, (add_path, add_entry)) in added.iter().enumerate() {
            if matched_adds.contains(&ai) {
                continue;
            }
            if del_entry.content_hash == add_entry.content_hash {
                changes.push(TreeChange::Renamed {
                    old_path: (*del_path).clone(),
                    new_path: (*add_path).clone(),
                    hash: del_entry.content_hash.clone(),
                });
                matched_deletes.insert(di);
                matched_adds.insert(ai);
                break;
            }
        }
    }

    for (di, (path, entry)) in deleted.iter().enumerate() {
        if !matched_deletes.contains(&di) {
            changes.push(TreeChange::Deleted {
                path: (*path).clone(),
                old_id: entry.content_id.clone(),
            });
        }
    }
    for (ai, (path, entry)) in added.iter().enumerate() {
        if !matched_adds.contains(&ai) {
            changes.push(TreeChange::Added {
                path: (*path).clone(),
                new_id: entry.content_id.clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.path().cmp(b.path()));
    TreeDiff { changes }
}
