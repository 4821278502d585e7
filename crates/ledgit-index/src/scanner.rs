//! Directory scanning with ignore rules and a size ceiling.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult};

/// Names skipped by default wherever they appear in the tree.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    ".DS_Store",
    "downloads",
    "package-lock.json",
];

/// Files larger than this are skipped by default (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// What a scan includes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Gitignore-style patterns, matched against every file and directory.
    pub ignore: Vec<String>,
    /// Honour `.gitignore` files found under the root.
    pub respect_gitignore: bool,
    pub max_file_size: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            respect_gitignore: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// A file the scan will commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedFile {
    /// Tree path, `/`-separated and relative to the scan root.
    pub path: String,
    pub abs_path: PathBuf,
    pub size: u64,
}

impl ScannedFile {
    pub fn read(&self) -> IndexResult<Vec<u8>> {
        std::fs::read(&self.abs_path).map_err(|source| IndexError::Io {
            path: self.abs_path.clone(),
            source,
        })
    }
}

/// Why a file was left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    Unreadable(String),
    /// The path cannot be expressed as a UTF-8 tree path.
    BadPath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// The result of one scan. `files` is sorted by path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl ScanReport {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Walks a working directory.
#[derive(Clone, Debug)]
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn scan(&self, root: &Path) -> IndexResult<ScanReport> {
        if !root.is_dir() {
            return Err(IndexError::NotADirectory(root.to_path_buf()));
        }
        let matcher = self.ignore_matcher(root)?;

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_global(false)
            .git_exclude(false)
            .git_ignore(self.options.respect_gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !matcher.matched(entry.path(), is_dir).is_ignore()
            });

        let mut report = ScanReport::default();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let abs_path = entry.path().to_path_buf();
            let Some(path) = relative_tree_path(root, &abs_path) else {
                report.skipped.push(SkippedFile {
                    path: abs_path,
                    reason: SkipReason::BadPath,
                });
                continue;
            };
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    report.skipped.push(SkippedFile {
                        path: abs_path,
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };
            if size > self.options.max_file_size {
                debug!(%path, size, limit = self.options.max_file_size, "skipping oversized file");
                report.skipped.push(SkippedFile {
                    path: abs_path,
                    reason: SkipReason::TooLarge {
                        size,
                        limit: self.options.max_file_size,
                    },
                });
                continue;
            }
            report.files.push(ScannedFile {
                path,
                abs_path,
                size,
            });
        }
        report.files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(report)
    }

    fn ignore_matcher(&self, root: &Path) -> IndexResult<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in &self.options.ignore {
            builder
                .add_line(None, pattern)
                .map_err(|e| IndexError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
        }
        builder.build().map_err(|e| IndexError::InvalidPattern {
            pattern: self.options.ignore.join(", "),
            reason: e.to_string(),
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

fn relative_tree_path(root: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            std::path::Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}
