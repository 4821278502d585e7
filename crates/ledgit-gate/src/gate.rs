use tracing::debug;

use crate::error::GateError;
use crate::stage::{AccessRequest, GateStage, StageDecision};
use crate::stages::{CollaboratorStage, OwnerOnlyStage, OwnerStage, PublicReadStage};

/// The result of running a request through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    /// Stage that decided, or `None` when no stage allowed the request.
    pub decided_by: Option<String>,
    pub reason: Option<String>,
}

/// An ordered pipeline of access stages.
///
/// The pipeline is **first-decision-wins**: stages run in order until one
/// allows or denies. A request every stage passes on is denied.
pub struct AccessGate {
    stages: Vec<Box<dyn GateStage>>,
}

impl AccessGate {
    /// An empty pipeline, which denies everything.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Owner -> public read -> owner-only -> collaborator.
    pub fn standard() -> Self {
        let mut gate = Self::new();
        gate.add_stage(Box::new(OwnerStage));
        gate.add_stage(Box::new(PublicReadStage));
        gate.add_stage(Box::new(OwnerOnlyStage));
        gate.add_stage(Box::new(CollaboratorStage));
        gate
    }

    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn evaluate(&self, request: &AccessRequest<'_>) -> AccessDecision {
        for stage in &self.stages {
            match stage.evaluate(request) {
                StageDecision::Continue => continue,
                StageDecision::Allow => {
                    return AccessDecision {
                        allowed: true,
                        decided_by: Some(stage.name().to_string()),
                        reason: None,
                    }
                }
                StageDecision::Deny { reason } => {
                    return AccessDecision {
                        allowed: false,
                        decided_by: Some(stage.name().to_string()),
                        reason: Some(reason),
                    }
                }
            }
        }
        AccessDecision {
            allowed: false,
            decided_by: None,
            reason: Some("not the owner or a collaborator".into()),
        }
    }

    /// Evaluate and convert a refusal into an error.
    pub fn check(&self, request: &AccessRequest<'_>) -> Result<(), GateError> {
        let decision = self.evaluate(request);
        if decision.allowed {
            return Ok(());
        }
        debug!(
            actor = %request.actor.short(),
            action = ?request.action,
            repo = %request.repo.name,
            stage = ?decision.decided_by,
            "access denied"
        );
        Err(GateError::PermissionDenied {
            actor: request.actor.clone(),
            action: request.action,
            repo: request.repo.name.clone(),
            reason: decision.reason.unwrap_or_default(),
        })
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("AccessGate").field("stages", &names).finish()
    }
}
