//! Per-service run records

use rollout_core::{DeployOutcome, DeploymentAttempt, HealthStatus};
use serde::{Deserialize, Serialize};

/// Last pipeline stage a service reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Pending,
    Validate,
    Build,
    Deploy,
    Health,
    Scale,
    Recovery,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Pending => "pending",
            Stage::Validate => "validate",
            Stage::Build => "build",
            Stage::Deploy => "deploy",
            Stage::Health => "health",
            Stage::Scale => "scale",
            Stage::Recovery => "recovery",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// What happened to one service during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub stage: Stage,
    pub deploy_outcome: DeployOutcome,
    pub attempts: Vec<DeploymentAttempt>,
    pub health: HealthStatus,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Succeeded deploy and healthy afterwards
    pub fn is_success(&self) -> bool {
        self.deploy_outcome.is_success() && self.health.is_healthy()
    }

    pub fn fail(&mut self, outcome: DeployOutcome, error: impl Into<String>) {
        self.deploy_outcome = outcome;
        self.error = Some(error.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!(service = %self.name, "{}", warning);
        self.warnings.push(warning);
    }
}
