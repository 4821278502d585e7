//! Working-directory tracking for ledgit.
//!
//! Walks a local directory the way a commit sees it (ignore list,
//! `.gitignore`, size ceiling), hashes what it finds, and classifies each
//! path against a committed tree.
//!
//! # Key Types
//!
//! - [`Scanner`] -- Directory walker configured by [`ScanOptions`]
//! - [`ScanReport`] -- Files found plus files skipped and why
//! - [`LocalIndex`] -- Path-keyed hashes of a scanned directory
//! - [`TreeStatus`] -- Added / modified / deleted / unchanged paths

pub mod entry;
pub mod error;
pub mod index;
pub mod scanner;
pub mod status;

pub use entry::{HashMode, IndexEntry};
pub use error::{IndexError, IndexResult};
pub use index::LocalIndex;
pub use scanner::{ScanOptions, ScanReport, ScannedFile, Scanner, SkipReason, SkippedFile};
pub use status::{classify, TreeStatus};
