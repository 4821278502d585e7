//! The standard stages, in pipeline order.

use crate::stage::{AccessRequest, Action, GateStage, StageDecision};

/// The owner may do anything.
pub struct OwnerStage;

impl GateStage for OwnerStage {
    fn name(&self) -> &str {
        "owner"
    }

    fn evaluate(&self, request: &AccessRequest<'_>) -> StageDecision {
        if request.actor == &request.repo.owner {
            StageDecision::Allow
        } else {
            StageDecision::Continue
        }
    }
}

/// Anyone may read a public repository.
pub struct PublicReadStage;

impl GateStage for PublicReadStage {
    fn name(&self) -> &str {
        "public-read"
    }

    fn evaluate(&self, request: &AccessRequest<'_>) -> StageDecision {
        if request.action == Action::Read && request.repo.visibility.is_public() {
            StageDecision::Allow
        } else {
            StageDecision::Continue
        }
    }
}

/// Settings changes are refused to everyone who got past [`OwnerStage`].
pub struct OwnerOnlyStage;

impl GateStage for OwnerOnlyStage {
    fn name(&self) -> &str {
        "owner-only"
    }

    fn evaluate(&self, request: &AccessRequest<'_>) -> StageDecision {
        if request.action.is_owner_only() {
            StageDecision::Deny {
                reason: "only the owner may do this".into(),
            }
        } else {
            StageDecision::Continue
        }
    }
}

/// Active collaborators may read and write.
pub struct CollaboratorStage;

impl GateStage for CollaboratorStage {
    fn name(&self) -> &str {
        "collaborator"
    }

    fn evaluate(&self, request: &AccessRequest<'_>) -> StageDecision {
        match request.action {
            Action::Read | Action::Write if request.repo.is_collaborator(request.actor) => {
                StageDecision::Allow
            }
            _ => StageDecision::Continue,
        }
    }
}
