use ledgit_types::Address;

use crate::stage::Action;

/// Errors produced by the access gate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    /// The actor may not perform the action on the repository.
    #[error("{actor} may not {action} repository {repo:?}: {reason}")]
    PermissionDenied {
        actor: Address,
        action: Action,
        repo: String,
        reason: String,
    },
}
