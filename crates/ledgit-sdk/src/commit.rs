use std::collections::BTreeSet;
use std::path::Path;

use ledgit_diff::{BlobDiff, TreeChange, TreeDiff};
use ledgit_ledger::{tree_path, Commit};
use serde::Serialize;

use crate::error::{SdkError, SdkResult};

/// One file to write in a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    /// `/`-separated path relative to the repository root.
    pub path: String,
    pub content: Vec<u8>,
}

/// What a commit changes relative to the previous tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    pub deletions: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.push(FileChange {
            path: path.into(),
            content: content.into(),
        });
        self
    }

    pub fn with_deletion(mut self, path: impl Into<String>) -> Self {
        self.deletions.push(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deletions.is_empty()
    }

    /// Every path must already be in normalized tree form, and appear once.
    pub(crate) fn validate(&self) -> SdkResult<()> {
        let mut seen = BTreeSet::new();
        let paths = self
            .files
            .iter()
            .map(|f| f.path.as_str())
            .chain(self.deletions.iter().map(String::as_str));
        for path in paths {
            if tree_path(Path::new(path)).as_deref() != Some(path) {
                return Err(SdkError::Validation(format!("invalid file path {path:?}")));
            }
            if !seen.insert(path) {
                return Err(SdkError::Validation(format!("path {path:?} appears twice")));
            }
        }
        Ok(())
    }
}

/// The result of a commit. Path lists are sorted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub commit: Commit,
    /// Paths whose content was uploaded by this commit.
    pub uploaded: Vec<String>,
    /// Paths whose content id was reused without uploading.
    pub reused: Vec<String>,
    /// Paths left out: uploads that failed every attempt, or files the
    /// directory scan refused.
    pub skipped: Vec<String>,
    pub deleted: Vec<String>,
}

/// The result of writing a commit's files to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutReport {
    pub commit: Commit,
    pub written: Vec<String>,
    /// Entries that could not be retrieved, verified, or placed safely.
    pub skipped: Vec<String>,
}

/// A file served from a public repository's latest commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFile {
    pub path: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// One changed path with its line diff, when both sides are readable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub change: TreeChange,
    pub lines: Option<BlobDiff>,
}

/// Differences between two commits of one repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoDiff {
    pub tree: TreeDiff,
    pub files: Vec<FileDiff>,
}

impl RepoDiff {
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
