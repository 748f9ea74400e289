//! Fly.io platform implementation

use crate::error::FlyError;
use crate::flyctl::{Flyctl, MachineInfo, TOKEN_ENV};
use async_trait::async_trait;
use rollout_core::{Region, ServiceSpec, ServiceState, tail_lines};
use rollout_platform::{
    DeployOutput, DeployRequest, Platform, ReplicaOutcome, Result, StatusSnapshot,
};

/// Fly.io platform
pub struct FlyPlatform {
    flyctl: Flyctl,
}

impl FlyPlatform {
    pub fn new(flyctl: Flyctl) -> Self {
        Self { flyctl }
    }

    /// Build from the environment, forwarding `PLATFORM_API_TOKEN`
    pub fn from_env() -> Self {
        let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Self::new(Flyctl::new(token))
    }
}

/// Reduce a machine list to one observed state
///
/// Any started machine means the service is serving. Otherwise a failed
/// machine marks it crashed, and a list made only of stopped or suspended
/// machines marks it stopped. Anything else (no machines, machines still
/// starting or being replaced) cannot be classified yet.
pub fn classify(machines: &[MachineInfo]) -> StatusSnapshot {
    if machines.is_empty() {
        return StatusSnapshot::unavailable();
    }

    let started = started_count(machines);
    let state = if started > 0 {
        ServiceState::Started
    } else if machines.iter().any(|m| m.is_failed()) {
        ServiceState::Crashed
    } else if machines.iter().all(|m| m.is_stopped()) {
        ServiceState::Stopped
    } else {
        ServiceState::Unavailable
    };

    StatusSnapshot {
        state,
        machine_count: Some(machines.len() as u32),
        started_count: started,
    }
}

fn started_count(machines: &[MachineInfo]) -> u32 {
    machines.iter().filter(|m| m.is_started()).count() as u32
}

/// Machine count to request so that at least `min` machines run, or `None`
/// when enough are already started. Stopped machines keep their slot, so the
/// shortfall is added on top of the current total.
pub fn scale_target(machines: &[MachineInfo], min: u32) -> Option<u32> {
    let started = started_count(machines);
    (started < min).then(|| machines.len() as u32 + (min - started))
}

#[async_trait]
impl Platform for FlyPlatform {
    fn name(&self) -> &str {
        "fly"
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> Result<DeployOutput> {
        self.flyctl.check_installed()?;

        let service = request.service;
        let output = self
            .flyctl
            .deploy(
                request.workdir,
                service.app_name(),
                &service.descriptor,
                request.strategy.as_str(),
                request.region().as_str(),
            )
            .await?;

        Ok(DeployOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn status(&self, service: &ServiceSpec) -> Result<StatusSnapshot> {
        let machines = match self.flyctl.list_machines(service.app_name()).await {
            Ok(machines) => machines,
            Err(e) => {
                tracing::warn!(app = service.app_name(), error = %e, "Status query failed");
                return Ok(StatusSnapshot::unavailable());
            }
        };
        let snapshot = classify(&machines);
        tracing::debug!(
            app = service.app_name(),
            state = %snapshot.state,
            machines = machines.len(),
            "Machine status"
        );
        Ok(snapshot)
    }

    async fn replicate(&self, service: &ServiceSpec, region: &Region) -> Result<ReplicaOutcome> {
        let app = service.app_name();
        let machines = self.flyctl.list_machines(app).await?;

        if machines.iter().any(|m| m.region == region.as_str()) {
            tracing::debug!(app, region = %region, "Machine already present in region");
            return Ok(ReplicaOutcome::AlreadyPresent);
        }

        // Clone from the primary region when possible so the replica runs the new release
        let source = machines
            .iter()
            .find(|m| m.region == service.primary_region.as_str())
            .or_else(|| machines.first())
            .ok_or_else(|| FlyError::NoMachines(app.to_string()))?;

        self.flyctl
            .clone_machine(app, &source.id, region.as_str())
            .await?;
        Ok(ReplicaOutcome::Created)
    }

    async fn ensure_min_instances(&self, service: &ServiceSpec, min: u32) -> Result<u32> {
        let app = service.app_name();
        let machines = self.flyctl.list_machines(app).await?;
        let Some(target) = scale_target(&machines, min) else {
            return Ok(started_count(&machines));
        };

        self.flyctl.scale_count(app, target).await?;
        Ok(min)
    }

    async fn restart(&self, service: &ServiceSpec) -> Result<()> {
        self.flyctl.restart_app(service.app_name()).await?;
        Ok(())
    }

    async fn recent_logs(&self, service: &ServiceSpec, lines: usize) -> Result<String> {
        let logs = self.flyctl.logs(service.app_name()).await?;
        Ok(tail_lines(&logs, lines))
    }
}
