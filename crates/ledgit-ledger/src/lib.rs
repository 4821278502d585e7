//! Append-only row model for ledgit.
//!
//! The ledger never updates a row. This crate turns that constraint into a
//! usable data model:
//! - A fixed catalogue of tables with deterministic ids ([`TableKind`], [`TableCatalog`])
//! - Typed row records with forward-compatible parsing ([`records`])
//! - One resolver for "current state": [`fold_latest`]
//! - Paged, failure-tolerant scans and attested appends ([`RowLog`])
//! - Idempotent table creation ([`SchemaBootstrapper`])
//! - The path → content mapping of a snapshot ([`FileTree`])
//! - Branch and repository name validation ([`names`])

pub mod bootstrap;
pub mod error;
pub mod fold;
pub mod log;
pub mod names;
pub mod records;
pub mod tables;
pub mod tree;

pub use bootstrap::{BootstrapReport, SchemaBootstrapper};
pub use error::{LedgerError, LedgerResult};
pub use fold::{fold_latest, latest, Stamped};
pub use log::RowLog;
pub use records::{
    BountyStatus, Collaborator, Comment, Commit, Fork, FundingPool, Issue, IssueStatus, Profile,
    PullRequest, PullRequestStatus, Reaction, ReactionTarget, Record, RefRow, Repository, Socials,
    Star, SCHEMA_VERSION,
};
pub use tables::{TableCatalog, TableKind};
pub use tree::{checkout_path, tree_path, FileTree, TreeEntry};
