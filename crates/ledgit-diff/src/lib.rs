//! Diff engine for ledgit.
//!
//! Compares two committed trees path by path (by content hash, so an
//! unchanged file re-uploaded under a new content id is not a change) and
//! produces line-level diffs of file bodies.
//!
//! # Key Types
//!
//! - [`TreeDiff`] / [`TreeChange`] -- Tree-level diff (added/deleted/modified/renamed paths)
//! - [`BlobDiff`] / [`DiffHunk`] / [`DiffLine`] -- Line-level blob diff

pub mod blob_diff;
pub mod tree_diff;

pub use blob_diff::{diff_blobs, BlobDiff, DiffHunk, DiffLine};
pub use tree_diff::{diff_trees, TreeChange, TreeDiff};
