//! Platform trait definition

use crate::error::Result;
use async_trait::async_trait;
use rollout_core::{Region, ServiceSpec, ServiceState};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hosting platform abstraction
///
/// Every operation is scoped to one service. Implementations must be safe to
/// call repeatedly: `replicate` and `ensure_min_instances` are expected to
/// converge instead of stacking new instances on every call.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Platform name (e.g. "fly")
    fn name(&self) -> &str;

    /// Run one deployment of the service to its primary region
    ///
    /// A deploy the platform rejected is reported through
    /// [`DeployOutput::success`]; `Err` is reserved for failures to run the
    /// deployment at all.
    async fn deploy(&self, request: &DeployRequest<'_>) -> Result<DeployOutput>;

    /// Current state of the service
    async fn status(&self, service: &ServiceSpec) -> Result<StatusSnapshot>;

    /// Make sure an instance exists in `region`
    async fn replicate(&self, service: &ServiceSpec, region: &Region) -> Result<ReplicaOutcome>;

    /// Make at least `min` instances run, returning the running count
    async fn ensure_min_instances(&self, service: &ServiceSpec, min: u32) -> Result<u32>;

    /// Restart every instance of the service
    async fn restart(&self, service: &ServiceSpec) -> Result<()>;

    /// Recent log output, newest last
    async fn recent_logs(&self, service: &ServiceSpec, lines: usize) -> Result<String>;
}

/// Rollout strategy passed to the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStrategy {
    /// Replace instances one at a time
    #[default]
    Rolling,
}

impl DeployStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStrategy::Rolling => "rolling",
        }
    }
}

/// A single deploy invocation
#[derive(Debug, Clone)]
pub struct DeployRequest<'a> {
    pub service: &'a ServiceSpec,

    /// Service source directory, already resolved against the registry root
    pub workdir: &'a Path,

    pub strategy: DeployStrategy,
}

impl<'a> DeployRequest<'a> {
    pub fn new(service: &'a ServiceSpec, workdir: &'a Path) -> Self {
        Self {
            service,
            workdir,
            strategy: DeployStrategy::Rolling,
        }
    }

    /// Region the deployment targets
    pub fn region(&self) -> &Region {
        &self.service.primary_region
    }
}

/// Captured result of a deploy command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl DeployOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Observed service state with instance counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ServiceState,

    /// Total instances, when the platform reported them
    pub machine_count: Option<u32>,

    /// Instances currently running
    pub started_count: u32,
}

impl StatusSnapshot {
    /// Snapshot for a platform that could not be queried
    pub fn unavailable() -> Self {
        Self {
            state: ServiceState::Unavailable,
            machine_count: None,
            started_count: 0,
        }
    }
}

/// Result of a replication request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaOutcome {
    Created,
    AlreadyPresent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let out = DeployOutput {
            success: false,
            exit_code: Some(1),
            stdout: "building\n".to_string(),
            stderr: "error: release failed".to_string(),
        };
        assert_eq!(out.combined(), "building\nerror: release failed");
        assert_eq!(DeployOutput::succeeded("ok").combined(), "ok");
        assert_eq!(DeployOutput::failed(2, "boom").combined(), "boom");
    }

    #[test]
    fn test_request_targets_primary_region() {
        let service = ServiceSpec::new(
            "web",
            "apps/web",
            vec![Region::parse("ord").unwrap(), Region::parse("iad").unwrap()],
        )
        .unwrap();
        let request = DeployRequest::new(&service, Path::new("/srv/apps/web"));
        assert_eq!(request.region().as_str(), "ord");
        assert_eq!(request.strategy.as_str(), "rolling");
    }
}
