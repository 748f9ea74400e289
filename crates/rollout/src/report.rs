//! Deployment reports
//!
//! A report is assembled once at the end of a deploy or recovery run, then
//! written to `<runs_dir>/deployment-report-<id>-<timestamp>.json`. The file
//! is written under a temporary name and renamed into place, so a reader
//! never sees a partial report.

use crate::health::observe;
use crate::record::{ServiceRecord, Stage};
use chrono::{DateTime, Utc};
use rollout_core::{DeployOutcome, DeploymentAttempt, HealthStatus};
use rollout_platform::Platform;
use rollout_registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Deploy,
    Recovery,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Deploy => write!(f, "deploy"),
            ReportKind::Recovery => write!(f, "recovery"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReport {
    pub stage: Stage,
    pub deploy_outcome: DeployOutcome,
    pub attempts: Vec<DeploymentAttempt>,
    pub health: HealthStatus,
    /// `None` when the platform could not be queried
    pub machine_count: Option<u32>,
    /// `None` when logs could not be fetched
    pub log_tail: Option<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub id: Uuid,
    pub kind: ReportKind,
    pub commit: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub services: BTreeMap<String, ServiceReport>,
}

impl DeploymentReport {
    /// Every service succeeded (deploy) or ended healthy (recovery)
    pub fn all_ok(&self) -> bool {
        self.services.values().all(|s| match self.kind {
            ReportKind::Deploy => s.deploy_outcome.is_success() && s.health.is_healthy(),
            ReportKind::Recovery => s.health.is_healthy(),
        })
    }

    /// Services that need attention
    pub fn failed_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, s)| match self.kind {
                ReportKind::Deploy => !(s.deploy_outcome.is_success() && s.health.is_healthy()),
                ReportKind::Recovery => !s.health.is_healthy(),
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn file_name(&self) -> String {
        format!(
            "deployment-report-{}-{}.json",
            self.id,
            self.finished_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    /// Write the report into `runs_dir`, returning the final path
    pub async fn persist(&self, runs_dir: &Path) -> Result<PathBuf, ReportError> {
        tokio::fs::create_dir_all(runs_dir).await?;

        let path = runs_dir.join(self.file_name());
        let tmp = runs_dir.join(format!(".{}.tmp", self.file_name()));

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::info!(path = %path.display(), "Report written");
        Ok(path)
    }
}

/// Builds reports, querying the platform for current instance counts and logs
pub struct ReportGenerator<'a> {
    platform: &'a dyn Platform,
    log_tail_lines: usize,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(platform: &'a dyn Platform, log_tail_lines: usize) -> Self {
        Self {
            platform,
            log_tail_lines,
        }
    }

    pub async fn generate(
        &self,
        id: Uuid,
        kind: ReportKind,
        commit: String,
        started_at: DateTime<Utc>,
        registry: &Registry,
        records: Vec<ServiceRecord>,
    ) -> DeploymentReport {
        let mut services = BTreeMap::new();

        for record in records {
            let Some(service) = registry.get(&record.name) else {
                continue;
            };
            let mut warnings = record.warnings;

            let machine_count = observe(self.platform, service).await.machine_count;
            if machine_count.is_none() {
                warnings.push("instance count unknown: platform reported none".to_string());
            }

            let log_tail = match self
                .platform
                .recent_logs(service, self.log_tail_lines)
                .await
            {
                Ok(logs) => Some(logs),
                Err(e) => {
                    warnings.push(format!("recent logs unknown: {}", e));
                    None
                }
            };

            services.insert(
                record.name,
                ServiceReport {
                    stage: record.stage,
                    deploy_outcome: record.deploy_outcome,
                    attempts: record.attempts,
                    health: record.health,
                    machine_count,
                    log_tail,
                    warnings,
                    error: record.error,
                },
            );
        }

        DeploymentReport {
            id,
            kind,
            commit,
            started_at,
            finished_at: Utc::now(),
            services,
        }
    }
}

/// `git rev-parse HEAD` in `dir`, or `unknown`
pub async fn commit_hash(dir: &Path) -> String {
    let output = tokio::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if hash.is_empty() {
                "unknown".to_string()
            } else {
                hash
            }
        }
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::{Region, ServiceSpec, ServiceState};
    use rollout_platform::testing::ScriptedPlatform;

    fn registry() -> Registry {
        Registry {
            name: "acme".to_string(),
            services: vec![
                ServiceSpec::new("api", "api", vec![Region::parse("ord").unwrap()]).unwrap(),
                ServiceSpec::new("web", "web", vec![Region::parse("ord").unwrap()]).unwrap(),
            ],
        }
    }

    fn records() -> Vec<ServiceRecord> {
        let mut api = ServiceRecord::new("api");
        api.stage = Stage::Done;
        api.deploy_outcome = DeployOutcome::Succeeded;
        api.health = HealthStatus::Healthy;

        let mut web = ServiceRecord::new("web");
        web.stage = Stage::Deploy;
        web.fail(DeployOutcome::ExhaustedFailed, "deploy failed after 5 attempts");

        vec![api, web]
    }

    #[tokio::test]
    async fn test_generate_queries_platform() {
        let platform = ScriptedPlatform::new()
            .with_logs("api", "line 1\nline 2\nline 3")
            .with_statuses("web", [ServiceState::Unavailable]);
        let generator = ReportGenerator::new(&platform, 2);

        let report = generator
            .generate(
                Uuid::new_v4(),
                ReportKind::Deploy,
                "abc123".to_string(),
                Utc::now(),
                &registry(),
                records(),
            )
            .await;

        let api = &report.services["api"];
        assert_eq!(api.machine_count, Some(1));
        assert_eq!(api.log_tail.as_deref(), Some("line 2\nline 3"));

        let web = &report.services["web"];
        assert_eq!(web.machine_count, None);
        assert!(web.warnings.iter().any(|w| w.contains("instance count unknown")));

        assert!(!report.all_ok());
        assert_eq!(report.failed_services(), vec!["web"]);
    }

    #[tokio::test]
    async fn test_transitional_machines_keep_reported_count() {
        let platform = ScriptedPlatform::new().with_transitional_machines("api", 3);
        let report = ReportGenerator::new(&platform, 20)
            .generate(
                Uuid::new_v4(),
                ReportKind::Recovery,
                "abc123".to_string(),
                Utc::now(),
                &registry(),
                records(),
            )
            .await;

        let api = &report.services["api"];
        assert_eq!(api.machine_count, Some(3));
        assert!(!api.warnings.iter().any(|w| w.contains("instance count unknown")));
    }

    #[tokio::test]
    async fn test_persist_writes_complete_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let platform = ScriptedPlatform::new();
        let report = ReportGenerator::new(&platform, 20)
            .generate(
                Uuid::new_v4(),
                ReportKind::Recovery,
                "unknown".to_string(),
                Utc::now(),
                &registry(),
                records(),
            )
            .await;

        let path = report.persist(temp_dir.path()).await.unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("deployment-report-{}-", report.id)));
        assert!(name.ends_with("Z.json"));

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let loaded: DeploymentReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
    }

    #[tokio::test]
    async fn test_commit_hash_outside_repository() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(commit_hash(temp_dir.path()).await, "unknown");
    }
}
