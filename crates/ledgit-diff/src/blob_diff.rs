//! Line-level diff of two file bodies, built on `similar` (Myers).

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Lines of unchanged context kept around each hunk.
const CONTEXT_LINES: usize = 3;

/// The result of diffing two file bodies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDiff {
    pub hunks: Vec<DiffHunk>,
    pub old_lines: usize,
    pub new_lines: usize,
    /// Either side was not UTF-8; `hunks` then holds one summary hunk.
    pub binary: bool,
}

impl BlobDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Added(_)))
    }

    pub fn deletions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Removed(_)))
    }

    fn count(&self, pred: impl Fn(&DiffLine) -> bool) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| pred(l))
            .count()
    }

    /// Render as unified-diff text under the given path.
    pub fn to_unified(&self, path: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- a/{path}");
        let _ = writeln!(out, "+++ b/{path}");
        for hunk in &self.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            );
            for line in &hunk.lines {
                let _ = match line {
                    DiffLine::Context(s) => writeln!(out, " {s}"),
                    DiffLine::Added(s) => writeln!(out, "+{s}"),
                    DiffLine::Removed(s) => writeln!(out, "-{s}"),
                };
            }
        }
        out
    }
}

/// A contiguous region of changes. Line numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

/// Compute a line diff between two file bodies.
///
/// Non-UTF-8 input yields a single summary hunk noting the byte sizes.
pub fn diff_blobs(old: &[u8], new: &[u8]) -> BlobDiff {
    let (Ok(old_str), Ok(new_str)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return binary_diff(old, new);
    };

    let old_lines = old_str.lines().count();
    let new_lines = new_str.lines().count();
    if old_str == new_str {
        return BlobDiff {
            hunks: Vec::new(),
            old_lines,
            new_lines,
            binary: false,
        };
    }

    let text_diff = TextDiff::from_lines(old_str, new_str);
    let hunks = text_diff
        .grouped_ops(CONTEXT_LINES)
        .iter()
        .filter_map(|group| {
            let first = group.first()?;
            let mut hunk = DiffHunk {
                old_start: first.old_range().start + 1,
                old_count: 0,
                new_start: first.new_range().start + 1,
                new_count: 0,
                lines: Vec::new(),
            };
            for op in group {
                for change in text_diff.iter_changes(op) {
                    let text = change.value().trim_end_matches('\n').to_string();
                    match change.tag() {
                        ChangeTag::Equal => {
                            hunk.lines.push(DiffLine::Context(text));
                            hunk.old_count += 1;
                            hunk.new_count += 1;
                        }
                        ChangeTag::Delete => {
                            hunk.lines.push(DiffLine::Removed(text));
                            hunk.old_count += 1;
                        }
                        ChangeTag::Insert => {
                            hunk.lines.push(DiffLine::Added(text));
                            hunk.new_count += 1;
                        }
                    }
                }
            }
            Some(hunk)
        })
        .collect();

    BlobDiff {
        hunks,
        old_lines,
        new_lines,
        binary: false,
    }
}

fn binary_diff(old: &[u8], new: &[u8]) -> BlobDiff {
    if old == new {
        return BlobDiff {
            hunks: Vec::new(),
            old_lines: 0,
            new_lines: 0,
            binary: true,
        };
    }
    let mut lines = Vec::new();
    if !old.is_empty() {
        lines.push(DiffLine::Removed(format!("(binary, {} bytes)", old.len())));
    }
    if !new.is_empty() {
        lines.push(DiffLine::Added(format!("(binary, {} bytes)", new.len())));
    }
    BlobDiff {
        hunks: vec![DiffHunk {
            old_start: 1,
            old_count: usize::from(!old.is_empty()),
            new_start: 1,
            new_count: usize::from(!new.is_empty()),
            lines,
        }],
        old_lines: 0,
        new_lines: 0,
        binary: true,
    }
}
