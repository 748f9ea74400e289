//! Scripted in-memory platform
//!
//! Each service gets a queue of deploy results and a queue of status
//! observations. When a queue runs dry the platform falls back to the
//! service's current state, which deploys and restarts update the way a real
//! platform would. Every call is recorded so tests can assert on ordering.

use crate::error::{PlatformError, Result};
use crate::platform::{DeployOutput, DeployRequest, Platform, ReplicaOutcome, StatusSnapshot};
use async_trait::async_trait;
use rollout_core::{Region, ServiceSpec, ServiceState};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Scripted result of one deploy call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployScript {
    Succeed,
    Fail,
    /// Never completes; only a timeout ends the attempt
    Hang,
}

/// A recorded platform call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Deploy { service: String, region: String },
    Status { service: String },
    Replicate { service: String, region: String },
    EnsureMin { service: String, min: u32 },
    Restart { service: String },
    Logs { service: String },
}

impl PlatformCall {
    pub fn service(&self) -> &str {
        match self {
            PlatformCall::Deploy { service, .. }
            | PlatformCall::Status { service }
            | PlatformCall::Replicate { service, .. }
            | PlatformCall::EnsureMin { service, .. }
            | PlatformCall::Restart { service }
            | PlatformCall::Logs { service } => service,
        }
    }
}

#[derive(Debug)]
struct ServiceScript {
    deploys: VecDeque<DeployScript>,
    statuses: VecDeque<ServiceState>,
    state: ServiceState,
    instances: u32,
    started_override: Option<u32>,
    regions: Vec<Region>,
    failing_regions: Vec<Region>,
    fail_restart: bool,
    restart_state: ServiceState,
    transitional: bool,
    logs: String,
}

impl Default for ServiceScript {
    fn default() -> Self {
        Self {
            deploys: VecDeque::new(),
            statuses: VecDeque::new(),
            state: ServiceState::Started,
            instances: 1,
            started_override: None,
            regions: Vec::new(),
            failing_regions: Vec::new(),
            fail_restart: false,
            restart_state: ServiceState::Started,
            transitional: false,
            logs: String::new(),
        }
    }
}

/// In-memory [`Platform`] driven by per-service scripts
#[derive(Debug, Default)]
pub struct ScriptedPlatform {
    services: Mutex<HashMap<String, ServiceScript>>,
    calls: Mutex<Vec<PlatformCall>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(mut self, service: &str, f: impl FnOnce(&mut ServiceScript)) -> Self {
        let services = self
            .services
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(services.entry(service.to_string()).or_default());
        self
    }

    /// Queue deploy results; once exhausted, deploys succeed
    pub fn with_deploys(self, service: &str, deploys: impl IntoIterator<Item = DeployScript>) -> Self {
        self.edit(service, |s| s.deploys.extend(deploys))
    }

    /// Queue status observations returned before the current state
    pub fn with_statuses(
        self,
        service: &str,
        statuses: impl IntoIterator<Item = ServiceState>,
    ) -> Self {
        self.edit(service, |s| s.statuses.extend(statuses))
    }

    /// Set the current state
    pub fn with_state(self, service: &str, state: ServiceState) -> Self {
        self.edit(service, |s| s.state = state)
    }

    /// Set the instance count and how many of them are running
    pub fn with_instances(self, service: &str, total: u32, started: u32) -> Self {
        self.edit(service, |s| {
            s.instances = total;
            s.started_override = Some(started);
        })
    }

    /// Make `restart` return an error
    pub fn with_failing_restart(self, service: &str) -> Self {
        self.edit(service, |s| s.fail_restart = true)
    }

    /// State the service lands in after a restart (default: started)
    pub fn with_restart_state(self, service: &str, state: ServiceState) -> Self {
        self.edit(service, |s| s.restart_state = state)
    }

    /// Unavailable observations still report the machine count, as when
    /// every machine is between states
    pub fn with_transitional_machines(self, service: &str, total: u32) -> Self {
        self.edit(service, |s| {
            s.state = ServiceState::Unavailable;
            s.instances = total;
            s.transitional = true;
        })
    }

    /// Make replication into `region` fail
    pub fn with_failing_replica(self, service: &str, region: &str) -> Self {
        let region = Region::parse(region).unwrap_or_else(|_| panic!("invalid region {region}"));
        self.edit(service, |s| s.failing_regions.push(region))
    }

    pub fn with_logs(self, service: &str, logs: &str) -> Self {
        let logs = logs.to_string();
        self.edit(service, |s| s.logs = logs)
    }

    fn services(&self) -> MutexGuard<'_, HashMap<String, ServiceScript>> {
        self.services
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: PlatformCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn deploy_count(&self, service: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::Deploy { service: s, .. } if s == service))
            .count()
    }

    pub fn restart_count(&self, service: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::Restart { service: s } if s == service))
            .count()
    }

    /// Services in the order they were first deployed
    pub fn deploy_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for call in self.calls() {
            if let PlatformCall::Deploy { service, .. } = call {
                if !order.contains(&service) {
                    order.push(service);
                }
            }
        }
        order
    }

    /// Current instance count
    pub fn instances(&self, service: &str) -> u32 {
        self.services()
            .get(service)
            .map(|s| s.instances)
            .unwrap_or(1)
    }

    /// Regions holding an instance
    pub fn regions(&self, service: &str) -> Vec<String> {
        self.services()
            .get(service)
            .map(|s| s.regions.iter().map(|r| r.to_string()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Platform for ScriptedPlatform {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> Result<DeployOutput> {
        let service = &request.service.name;
        let region = request.region();
        self.record(PlatformCall::Deploy {
            service: service.clone(),
            region: region.to_string(),
        });

        let script = {
            let mut services = self.services();
            let entry = services.entry(service.clone()).or_default();
            let script = entry.deploys.pop_front().unwrap_or(DeployScript::Succeed);
            if script == DeployScript::Succeed {
                entry.state = ServiceState::Started;
                if !entry.regions.contains(region) {
                    entry.regions.push(region.clone());
                }
            }
            script
        };

        match script {
            DeployScript::Succeed => Ok(DeployOutput::succeeded(format!(
                "==> Deploying {}\n--> v2 deployed successfully",
                request.service.app_name()
            ))),
            DeployScript::Fail => Ok(DeployOutput::failed(
                1,
                format!(
                    "==> Deploying {}\nError: release command failed",
                    request.service.app_name()
                ),
            )),
            DeployScript::Hang => std::future::pending().await,
        }
    }

    async fn status(&self, service: &ServiceSpec) -> Result<StatusSnapshot> {
        self.record(PlatformCall::Status {
            service: service.name.clone(),
        });

        let mut services = self.services();
        let entry = services.entry(service.name.clone()).or_default();
        let state = entry.statuses.pop_front().unwrap_or(entry.state);

        if state == ServiceState::Unavailable {
            if entry.transitional {
                return Ok(StatusSnapshot {
                    state,
                    machine_count: Some(entry.instances),
                    started_count: 0,
                });
            }
            return Ok(StatusSnapshot::unavailable());
        }

        let started_count = match state {
            ServiceState::Started => entry.started_override.unwrap_or(entry.instances),
            _ => 0,
        };
        Ok(StatusSnapshot {
            state,
            machine_count: Some(entry.instances),
            started_count,
        })
    }

    async fn replicate(&self, service: &ServiceSpec, region: &Region) -> Result<ReplicaOutcome> {
        self.record(PlatformCall::Replicate {
            service: service.name.clone(),
            region: region.to_string(),
        });

        let mut services = self.services();
        let entry = services.entry(service.name.clone()).or_default();
        if entry.failing_regions.contains(region) {
            return Err(PlatformError::CommandFailed {
                command: format!("clone {} --region {}", service.app_name(), region),
                message: "capacity unavailable".to_string(),
            });
        }
        if entry.regions.contains(region) {
            return Ok(ReplicaOutcome::AlreadyPresent);
        }
        entry.regions.push(region.clone());
        entry.instances += 1;
        Ok(ReplicaOutcome::Created)
    }

    async fn ensure_min_instances(&self, service: &ServiceSpec, min: u32) -> Result<u32> {
        self.record(PlatformCall::EnsureMin {
            service: service.name.clone(),
            min,
        });

        let mut services = self.services();
        let entry = services.entry(service.name.clone()).or_default();
        if entry.instances < min {
            entry.instances = min;
        }
        Ok(entry.instances)
    }

    async fn restart(&self, service: &ServiceSpec) -> Result<()> {
        self.record(PlatformCall::Restart {
            service: service.name.clone(),
        });

        let mut services = self.services();
        let entry = services.entry(service.name.clone()).or_default();
        if entry.fail_restart {
            return Err(PlatformError::CommandFailed {
                command: format!("restart {}", service.app_name()),
                message: "no machines could be restarted".to_string(),
            });
        }
        entry.state = entry.restart_state;
        Ok(())
    }

    async fn recent_logs(&self, service: &ServiceSpec, lines: usize) -> Result<String> {
        self.record(PlatformCall::Logs {
            service: service.name.clone(),
        });

        let services = self.services();
        let logs = services
            .get(&service.name)
            .map(|s| s.logs.clone())
            .unwrap_or_default();
        Ok(rollout_core::tail_lines(&logs, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn service(name: &str, regions: &[&str]) -> ServiceSpec {
        let regions = regions.iter().map(|r| Region::parse(r).unwrap()).collect();
        ServiceSpec::new(name, name, regions).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_script_then_default_success() {
        let platform = ScriptedPlatform::new().with_deploys("api", [DeployScript::Fail]);
        let api = service("api", &["ord"]);
        let request = DeployRequest::new(&api, Path::new("api"));

        assert!(!platform.deploy(&request).await.unwrap().success);
        assert!(platform.deploy(&request).await.unwrap().success);
        assert_eq!(platform.deploy_count("api"), 2);
    }

    #[tokio::test]
    async fn test_status_queue_falls_back_to_state() {
        let platform = ScriptedPlatform::new()
            .with_state("api", ServiceState::Crashed)
            .with_statuses("api", [ServiceState::Unavailable]);
        let api = service("api", &["ord"]);

        assert_eq!(
            platform.status(&api).await.unwrap(),
            StatusSnapshot::unavailable()
        );
        let snapshot = platform.status(&api).await.unwrap();
        assert_eq!(snapshot.state, ServiceState::Crashed);
        assert_eq!(snapshot.started_count, 0);
    }

    #[tokio::test]
    async fn test_replicate_is_idempotent() {
        let platform = ScriptedPlatform::new();
        let web = service("web", &["ord", "iad"]);
        let iad = Region::parse("iad").unwrap();

        platform
            .deploy(&DeployRequest::new(&web, Path::new("web")))
            .await
            .unwrap();
        assert_eq!(
            platform.replicate(&web, &iad).await.unwrap(),
            ReplicaOutcome::Created
        );
        assert_eq!(
            platform.replicate(&web, &iad).await.unwrap(),
            ReplicaOutcome::AlreadyPresent
        );
        assert_eq!(platform.instances("web"), 2);
        assert_eq!(platform.regions("web"), vec!["ord", "iad"]);
    }

    #[tokio::test]
    async fn test_restart_failure() {
        let platform = ScriptedPlatform::new()
            .with_state("api", ServiceState::Crashed)
            .with_failing_restart("api");
        let api = service("api", &["ord"]);

        assert!(platform.restart(&api).await.is_err());
        assert_eq!(
            platform.status(&api).await.unwrap().state,
            ServiceState::Crashed
        );
    }

    #[tokio::test]
    async fn test_ensure_min_instances() {
        let platform = ScriptedPlatform::new();
        let web = service("web", &["ord", "iad"]);
        assert_eq!(platform.ensure_min_instances(&web, 2).await.unwrap(), 2);
        assert_eq!(platform.ensure_min_instances(&web, 1).await.unwrap(), 2);
    }
}
