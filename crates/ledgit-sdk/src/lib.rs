//! The ledgit engine.
//!
//! Version control and collaboration on top of an append-only ledger. A
//! [`Session`] wraps one identity and one ledger connection; every
//! operation is a method on it:
//! - Repositories, commits, trees, checkout, status and diff
//! - Branches, forks and fast-forward pull request merges with bounty payout
//! - Collaborators, private-repository keys and permission checks
//! - Issues, pull requests, comments, reactions, stars, profiles and the
//!   funding pool
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ledgit_crypto::LocalIdentity;
//! use ledgit_sdk::{ChangeSet, Session};
//! use ledgit_store::InMemoryLedgerStore;
//! use ledgit_types::Visibility;
//!
//! # async fn demo() -> ledgit_sdk::SdkResult<()> {
//! let session = Session::builder(
//!     Arc::new(InMemoryLedgerStore::new()),
//!     Arc::new(LocalIdentity::generate()),
//! )
//! .build()?;
//!
//! session.create_repo("demo", "a demo", Visibility::Public).await?;
//! let changes = ChangeSet::new().with_file("index.html", "<h1>hi</h1>");
//! let outcome = session.commit("demo", "first", changes).await?;
//! let page = session.read_file(&outcome.commit.id, "index.html").await?;
//! assert_eq!(page.to_string(), "<h1>hi</h1>");
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod branches;
pub mod collab;
pub mod commit;
pub mod config;
pub mod content;
pub mod error;
pub mod markers;
pub mod repository;
pub mod session;

#[cfg(test)]
mod tests;

pub use branches::{Branch, MergeOutcome};
pub use collab::{ProfileUpdate, ReactionSummary, REACTION_EMOJI};
pub use commit::{
    ChangeSet, CheckoutReport, CommitOutcome, FileChange, FileDiff, RawFile, RepoDiff,
};
pub use config::EngineConfig;
pub use content::{mime_for_path, FileContent};
pub use error::{ErrorKind, SdkError, SdkResult};
pub use session::{Session, SessionBuilder};

// Re-export the types callers handle most
pub use ledgit_index::TreeStatus;
pub use ledgit_ledger::{
    Comment, Commit, FileTree, Fork, FundingPool, Issue, IssueStatus, Profile, PullRequest,
    PullRequestStatus, ReactionTarget, Repository, Socials,
};
pub use ledgit_types::{Address, Amount, RecordId, Role, Visibility};
