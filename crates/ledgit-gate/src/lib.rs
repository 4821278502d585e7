//! Access-control gate for ledgit repositories.
//!
//! Every engine operation that reads private content, appends rows on
//! behalf of a repository, or changes its settings asks the gate first. The
//! gate runs a short pipeline of stages; the first stage to allow or deny
//! decides, and a request no stage allows is denied.
//!
//! The rules:
//! - Read: public repositories always; private ones for the owner or an
//!   active collaborator.
//! - Write: the owner or an active collaborator, whatever the visibility.
//! - Visibility changes and collaborator management: the owner only.
//!
//! # Quick Start
//!
//! ```rust
//! use ledgit_gate::{AccessGate, AccessRequest, Action, RepoAccess};
//! use ledgit_types::{Address, Visibility};
//!
//! let owner = Address::from_key_bytes(&[1u8; 32]);
//! let visitor = Address::from_key_bytes(&[2u8; 32]);
//! let repo = RepoAccess::new("demo", owner, Visibility::Public, vec![]);
//!
//! let gate = AccessGate::standard();
//! assert!(gate.check(&AccessRequest::new(&visitor, Action::Read, &repo)).is_ok());
//! assert!(gate.check(&AccessRequest::new(&visitor, Action::Write, &repo)).is_err());
//! ```

pub mod error;
pub mod gate;
pub mod stage;
pub mod stages;

pub use error::GateError;
pub use gate::{AccessDecision, AccessGate};
pub use stage::{AccessRequest, Action, GateStage, RepoAccess, StageDecision};
pub use stages::{CollaboratorStage, OwnerOnlyStage, OwnerStage, PublicReadStage};
