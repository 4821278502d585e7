//! Foundation types for ledgit.
//!
//! Every other ledgit crate depends on `ledgit-types`. Nothing here talks to
//! the ledger; these are the plain values that rows and content carry.
//!
//! # Key Types
//!
//! - [`ContentId`]: Opaque reference returned by the ledger when content is stored
//! - [`TableId`]: Deterministic 32-byte identifier of a logical table
//! - [`RecordId`]: UUID v7 identifier for issues, pull requests, comments
//! - [`Address`]: Public address of an identity
//! - [`Timestamp`] / [`Clock`]: Millisecond wall-clock time, issued monotonically
//! - [`Amount`]: Integer base-unit amount for bounties and donations
//! - [`Visibility`] / [`Role`]: Repository access attributes

pub mod access;
pub mod address;
pub mod amount;
pub mod error;
pub mod ids;
pub mod temporal;

pub use access::{Role, Visibility};
pub use address::Address;
pub use amount::Amount;
pub use error::TypeError;
pub use ids::{ContentId, RecordId, TableId};
pub use temporal::{Clock, Timestamp};
