//! Recovery sweep
//!
//! Looks at every registered service once. Unreachable services are
//! restarted; when the restart fails or the service is still unreachable
//! afterwards, the service is redeployed with the normal retry contract. A
//! status that stays unavailable after a restart is only a warning. The
//! sweep never stops early, and a service that needs no action is left alone,
//! so running it twice without outside changes yields the same result.

use crate::deployer::{BackoffPolicy, Deployer};
use crate::health::{HealthVerifier, classify, observe};
use crate::record::{ServiceRecord, Stage};
use crate::runlog::RunLog;
use rollout_config::Settings;
use rollout_core::{HealthStatus, ServiceSpec};
use rollout_platform::Platform;
use rollout_registry::Registry;
use std::path::Path;

pub struct RecoveryAgent<'a> {
    platform: &'a dyn Platform,
    settings: &'a Settings,
    root: &'a Path,
    run_log: &'a RunLog,
}

impl<'a> RecoveryAgent<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        settings: &'a Settings,
        root: &'a Path,
        run_log: &'a RunLog,
    ) -> Self {
        Self {
            platform,
            settings,
            root,
            run_log,
        }
    }

    pub async fn sweep(&self, registry: &Registry) -> Vec<ServiceRecord> {
        let mut records = Vec::with_capacity(registry.len());
        for service in registry.iter() {
            let record = self.recover(service).await;
            self.run_log.banner(&format!(
                "recovery {}: {}",
                service.name, record.health
            ));
            records.push(record);
        }

        let healthy = records.iter().filter(|r| r.health.is_healthy()).count();
        tracing::info!(healthy, total = records.len(), "Recovery sweep complete");
        records
    }

    async fn recover(&self, service: &ServiceSpec) -> ServiceRecord {
        let mut record = ServiceRecord::new(&service.name);
        record.stage = Stage::Recovery;

        let snapshot = observe(self.platform, service).await;
        record.health = classify(&snapshot);
        tracing::info!(service = %service.name, state = %snapshot.state, health = %record.health, "Checked service");

        if record.health != HealthStatus::Unreachable {
            if record.health == HealthStatus::Unknown {
                record.warn("status unavailable; no remediation attempted");
            }
            return record;
        }

        let verifier = HealthVerifier::from_settings(self.platform, self.settings);

        self.run_log.banner(&format!("restart {}", service.name));
        match self.platform.restart(service).await {
            Ok(()) => {
                let check = verifier.verify(service).await;
                record.health = check.status;
                match check.status {
                    HealthStatus::Unreachable => {
                        record.warn("still unreachable after restart");
                    }
                    HealthStatus::Unknown => {
                        record.warn("status unavailable after restart; not redeploying");
                        return record;
                    }
                    HealthStatus::Healthy | HealthStatus::Degraded => {
                        tracing::info!(service = %service.name, "Recovered by restart");
                        return record;
                    }
                }
            }
            Err(e) => {
                record.warn(format!("restart failed: {}", e));
            }
        }

        let workdir = self.root.join(&service.path);
        let deployer = Deployer::new(
            self.platform,
            BackoffPolicy::from_settings(self.settings),
            self.settings.log_tail_lines,
            self.run_log,
        );
        let result = deployer.deploy(service, &workdir).await;
        record.deploy_outcome = result.outcome;
        record.attempts = result.attempts;

        if result.outcome.is_success() {
            let check = verifier.verify(service).await;
            record.health = check.status;
            if check.status.is_healthy() {
                tracing::info!(service = %service.name, "Recovered by redeploy");
                return record;
            }
        } else {
            record.health = HealthStatus::Unreachable;
        }

        tracing::error!(service = %service.name, "Recovery failed; manual intervention required");
        record.error = Some("recovery failed; manual intervention required".to_string());
        record
    }
}
