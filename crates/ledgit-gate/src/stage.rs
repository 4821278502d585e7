use std::fmt;

use ledgit_types::{Address, Visibility};
use serde::{Deserialize, Serialize};

/// What the actor wants to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Read commits, trees and file content.
    Read,
    /// Commit, create branches, merge pull requests.
    Write,
    /// Switch between public and private.
    ChangeVisibility,
    /// Add or remove collaborators, export the repository key.
    ManageCollaborators,
}

impl Action {
    /// Actions reserved for the repository owner.
    pub fn is_owner_only(&self) -> bool {
        matches!(self, Self::ChangeVisibility | Self::ManageCollaborators)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write to",
            Self::ChangeVisibility => "change the visibility of",
            Self::ManageCollaborators => "manage collaborators of",
        };
        f.write_str(s)
    }
}

/// The access-relevant facts about one repository, as currently resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoAccess {
    pub name: String,
    pub owner: Address,
    pub visibility: Visibility,
    /// Active collaborators.
    pub collaborators: Vec<Address>,
}

impl RepoAccess {
    pub fn new(
        name: impl Into<String>,
        owner: Address,
        visibility: Visibility,
        collaborators: Vec<Address>,
    ) -> Self {
        Self {
            name: name.into(),
            owner,
            visibility,
            collaborators,
        }
    }

    pub fn is_collaborator(&self, who: &Address) -> bool {
        self.collaborators.iter().any(|c| c == who)
    }
}

/// One access question.
#[derive(Clone, Copy, Debug)]
pub struct AccessRequest<'a> {
    pub actor: &'a Address,
    pub action: Action,
    pub repo: &'a RepoAccess,
}

impl<'a> AccessRequest<'a> {
    pub fn new(actor: &'a Address, action: Action, repo: &'a RepoAccess) -> Self {
        Self {
            actor,
            action,
            repo,
        }
    }
}

/// The outcome of one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// Grant; later stages are skipped.
    Allow,
    /// Refuse; later stages are skipped.
    Deny { reason: String },
    /// No opinion; ask the next stage.
    Continue,
}

/// A single rule in the gate pipeline.
pub trait GateStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, request: &AccessRequest<'_>) -> StageDecision;
}
