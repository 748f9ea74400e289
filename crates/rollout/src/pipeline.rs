//! Deployment pipeline
//!
//! Services run strictly one after another in registry order. Each one goes
//! through validate, build, deploy, health and scale. A failure is recorded
//! on the service and the pipeline moves on to the next one.

use crate::deployer::{BackoffPolicy, Deployer};
use crate::health::HealthVerifier;
use crate::record::{ServiceRecord, Stage};
use crate::runlog::RunLog;
use crate::scaler::RegionScaler;
use rollout_build::{BuildOutcome, build_service, validate_service};
use rollout_config::Settings;
use rollout_core::{DeployOutcome, HealthStatus, ServiceSpec};
use rollout_platform::Platform;
use rollout_registry::Registry;
use std::path::Path;

pub struct Pipeline<'a> {
    platform: &'a dyn Platform,
    settings: &'a Settings,
    root: &'a Path,
    run_log: &'a RunLog,
}

impl<'a> Pipeline<'a> {
    /// `root` is the directory service paths are resolved against
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

    pub async fn run(&self, registry: &Registry) -> Vec<ServiceRecord> {
        let mut records: Vec<ServiceRecord> = Vec::with_capacity(registry.len());

        for (position, service) in registry.iter().enumerate() {
            tracing::info!(
                service = %service.name,
                position = position + 1,
                total = registry.len(),
                "Starting service"
            );
            self.run_log.banner(&format!(
                "service {} ({}/{})",
                service.name,
                position + 1,
                registry.len()
            ));

            let record = self.run_service(service, &records).await;
            self.run_log.banner(&format!(
                "service {} finished: {} / {}",
                service.name, record.deploy_outcome, record.health
            ));
            records.push(record);
        }

        records
    }

    async fn run_service(&self, service: &ServiceSpec, earlier: &[ServiceRecord]) -> ServiceRecord {
        let mut record = ServiceRecord::new(&service.name);
        let workdir = self.root.join(&service.path);

        for dependency in &service.after {
            let healthy = earlier
                .iter()
                .find(|r| &r.name == dependency)
                .is_some_and(|r| r.is_success());
            if !healthy {
                record.warn(format!(
                    "dependency {} did not finish healthy; deploying anyway",
                    dependency
                ));
            }
        }

        record.stage = Stage::Validate;
        if let Err(errors) = validate_service(service, &workdir) {
            let causes: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            for cause in &causes {
                tracing::error!(service = %service.name, "Validation failed: {}", cause);
            }
            self.run_log
                .output(&format!("{} validation", service.name), &causes.join("\n"));
            record.fail(DeployOutcome::ValidationFailed, causes.join("; "));
            return record;
        }

        record.stage = Stage::Build;
        match build_service(service, &workdir).await {
            Ok(BuildOutcome::Skipped) => {
                tracing::debug!(service = %service.name, "No build step");
            }
            Ok(BuildOutcome::Built { output }) => {
                self.run_log
                    .output(&format!("{} build", service.name), &output);
            }
            Err(e) => {
                tracing::error!(service = %service.name, error = %e, "Build failed");
                self.run_log
                    .output(&format!("{} build", service.name), &e.user_message());
                record.fail(DeployOutcome::BuildFailed, e.to_string());
                return record;
            }
        }

        record.stage = Stage::Deploy;
        let deployer = Deployer::new(
            self.platform,
            BackoffPolicy::from_settings(self.settings),
            self.settings.log_tail_lines,
            self.run_log,
        );
        let result = deployer.deploy(service, &workdir).await;
        record.deploy_outcome = result.outcome;
        record.attempts = result.attempts;
        if !result.outcome.is_success() {
            record.error = Some(format!(
                "deploy failed after {} attempts",
                record.attempts.len()
            ));
            return record;
        }

        record.stage = Stage::Health;
        let check = HealthVerifier::from_settings(self.platform, self.settings)
            .verify(service)
            .await;
        record.health = check.status;
        match check.status {
            HealthStatus::Unreachable => {
                record.error = Some(format!("service is {} after deploy", check.last.state));
                if service.is_multi_region() {
                    let skipped: Vec<&str> =
                        service.secondary_regions.iter().map(|r| r.as_str()).collect();
                    record.warn(format!(
                        "replication to {} skipped: service unreachable",
                        skipped.join(", ")
                    ));
                }
                return record;
            }
            HealthStatus::Unknown => {
                record.warn(format!(
                    "status unavailable for all {} health polls",
                    check.polls
                ));
            }
            _ => {}
        }

        record.stage = Stage::Scale;
        let scaled = RegionScaler::new(self.platform, self.settings.min_instances)
            .scale(service)
            .await;
        record.warnings.extend(scaled.warnings);

        record.stage = Stage::Done;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::{Region, ServiceState};
    use rollout_platform::testing::{DeployScript, PlatformCall, ScriptedPlatform};
    use std::fs;
    use std::path::PathBuf;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        log: RunLog,
    }

    fn fixture(services: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        for (name, region) in services {
            let service_dir = root.join(name);
            fs::create_dir_all(&service_dir).unwrap();
            fs::write(
                service_dir.join("fly.toml"),
                format!("app = \"{}\"\nprimary_region = \"{}\"\n", name, region),
            )
            .unwrap();
        }
        let log = RunLog::create(&root.join("runs"), "test-run").unwrap();
        Fixture {
            _dir: dir,
            root,
            log,
        }
    }

    fn service(name: &str, regions: &[&str]) -> ServiceSpec {
        let regions = regions.iter().map(|r| Region::parse(r).unwrap()).collect();
        ServiceSpec::new(name, name, regions).unwrap()
    }

    fn registry(services: Vec<ServiceSpec>) -> Registry {
        Registry {
            name: "acme".to_string(),
            services,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_foundation_does_not_block_dependent() {
        let fx = fixture(&[("db", "ord"), ("api", "ord")]);
        let platform = ScriptedPlatform::new().with_deploys("db", [DeployScript::Fail; 5]);
        let settings = Settings::default();

        let mut api = service("api", &["ord"]);
        api.after = vec!["db".to_string()];
        let registry = registry(vec![service("db", &["ord"]), api]);

        let records = Pipeline::new(&platform, &settings, &fx.root, &fx.log)
            .run(&registry)
            .await;

        assert_eq!(records[0].deploy_outcome, DeployOutcome::ExhaustedFailed);
        assert_eq!(records[0].attempts.len(), 5);
        assert_eq!(records[1].deploy_outcome, DeployOutcome::Succeeded);
        assert_eq!(records[1].health, HealthStatus::Healthy);
        assert!(records[1].warnings[0].contains("dependency db"));
        assert_eq!(platform.deploy_count("db"), 5);
        assert_eq!(platform.deploy_count("api"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_services_run_in_registry_order() {
        let fx = fixture(&[("db", "ord"), ("api", "ord"), ("web", "ord")]);
        let platform = ScriptedPlatform::new().with_deploys("api", [DeployScript::Fail]);
        let settings = Settings::default();
        let registry = registry(vec![
            service("db", &["ord"]),
            service("api", &["ord"]),
            service("web", &["ord"]),
        ]);

        Pipeline::new(&platform, &settings, &fx.root, &fx.log)
            .run(&registry)
            .await;

        assert_eq!(platform.deploy_order(), vec!["db", "api", "web"]);

        // Every call for an earlier service happens before the first call for a later one
        let calls = platform.calls();
        let last_api = calls.iter().rposition(|c| c.service() == "api").unwrap();
        let first_web = calls.iter().position(|c| c.service() == "web").unwrap();
        assert!(last_api < first_web);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_region_success_replicates_secondaries() {
        let fx = fixture(&[("web", "ord")]);
        let platform = ScriptedPlatform::new();
        let settings = Settings::default();
        let registry = registry(vec![service("web", &["ord", "iad", "sjc"])]);

        let records = Pipeline::new(&platform, &settings, &fx.root, &fx.log)
            .run(&registry)
            .await;

        assert!(records[0].is_success());
        assert_eq!(records[0].stage, Stage::Done);
        assert_eq!(records[0].attempts.len(), 1);

        let replicated: Vec<String> = platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Replicate { region, .. } => Some(region),
                _ => None,
            })
            .collect();
        assert_eq!(replicated, vec!["iad", "sjc"]);

        let deploy_regions: Vec<String> = platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Deploy { region, .. } => Some(region),
                _ => None,
            })
            .collect();
        assert_eq!(deploy_regions, vec!["ord"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_failure_skips_deploy() {
        let fx = fixture(&[("api", "ord")]);
        let platform = ScriptedPlatform::new();
        let settings = Settings::default();
        let registry = registry(vec![service("web", &["ord"]), service("api", &["ord"])]);

        let records = Pipeline::new(&platform, &settings, &fx.root, &fx.log)
            .run(&registry)
            .await;

        assert_eq!(records[0].deploy_outcome, DeployOutcome::ValidationFailed);
        assert_eq!(records[0].stage, Stage::Validate);
        assert!(records[0].error.is_some());
        assert_eq!(platform.deploy_count("web"), 0);
        assert!(records[1].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_after_deploy_skips_scaling() {
        let fx = fixture(&[("web", "ord")]);
        let platform =
            ScriptedPlatform::new().with_statuses("web", [ServiceState::Crashed]);
        let settings = Settings::default();
        let registry = registry(vec![service("web", &["ord", "iad"])]);

        let records = Pipeline::new(&platform, &settings, &fx.root, &fx.log)
            .run(&registry)
            .await;

        assert_eq!(records[0].deploy_outcome, DeployOutcome::Succeeded);
        assert_eq!(records[0].health, HealthStatus::Unreachable);
        assert_eq!(records[0].stage, Stage::Health);
        assert!(!records[0].is_success());
        assert_eq!(
            records[0].warnings,
            vec!["replication to iad skipped: service unreachable".to_string()]
        );
        assert!(
            !platform
                .calls()
                .iter()
                .any(|c| matches!(c, PlatformCall::Replicate { .. }))
        );
    }
}
