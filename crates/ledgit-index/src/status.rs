//! Working directory status relative to a committed tree.

use std::collections::BTreeMap;

use ledgit_crypto::ContentHash;
use serde::{Deserialize, Serialize};

/// How each path of the working directory compares to a committed tree.
/// Every list is sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStatus {
    /// Present locally, absent from the tree.
    pub added: Vec<String>,
    /// Present in both with different hashes.
    pub modified: Vec<String>,
    /// Present in the tree, absent locally.
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
}

impl TreeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing was added, modified or deleted.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Number of changed paths.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// Compare local hashes against committed ones, path by path.
pub fn classify(
    local: &BTreeMap<String, ContentHash>,
    committed: &BTreeMap<String, ContentHash>,
) -> TreeStatus {
    let mut status = TreeStatus::new();
    for (path, hash) in local {
        match committed.get(path) {
            None => status.added.push(path.clone()),
            Some(old) if old != hash => status.modified.push(path.clone()),
            Some(_) => status.unchanged.push(path.clone()),
        }
    }
    status.deleted = committed
        .keys()
        .filter(|path| !local.contains_key(*path))
        .cloned()
        .collect();
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(pairs: &[(&str, &str)]) -> BTreeMap<String, ContentHash> {
        pairs
            .iter()
            .map(|(p, h)| (p.to_string(), ContentHash::new_unchecked(*h)))
            .collect()
    }

    #[test]
    fn empty_status_is_clean() {
        let status = TreeStatus::new();
        assert!(status.is_clean());
        assert_eq!(status.change_count(), 0);
    }

    #[test]
    fn identical_maps_are_clean() {
        let m = hashes(&[("a", "1"), ("b/c", "2")]);
        let status = classify(&m, &m);
        assert!(status.is_clean());
        assert_eq!(status.unchanged, vec!["a", "b/c"]);
    }

    #[test]
    fn classifies_every_kind() {
        let local = hashes(&[("keep", "1"), ("edit", "2"), ("new", "3")]);
        let committed = hashes(&[("keep", "1"), ("edit", "x"), ("gone", "4")]);
        let status = classify(&local, &committed);
        assert_eq!(status.added, vec!["new"]);
        assert_eq!(status.modified, vec!["edit"]);
        assert_eq!(status.deleted, vec!["gone"]);
        assert_eq!(status.unchanged, vec!["keep"]);
        assert!(!status.is_clean());
        assert_eq!(status.change_count(), 3);
    }
}
