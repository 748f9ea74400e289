pub mod deploy;
pub mod monitor;
pub mod recover;
pub mod validate;

use anyhow::{Context as _, bail};
use colored::Colorize;
use rollout::{DeploymentReport, PrerequisiteChecker, ReportKind};
use rollout_config::Settings;
use rollout_core::{DeployOutcome, HealthStatus};
use rollout_registry::Registry;
use std::path::{Path, PathBuf};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_PREREQUISITES: i32 = 3;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Failure after the prerequisite check passed: the run is failed, not misused
#[derive(Debug, thiserror::Error)]
#[error("{0:#}")]
pub struct RunFailed(pub anyhow::Error);

/// Exit code for an error that ended a command early
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    if err.is::<RunFailed>() {
        EXIT_FAILED
    } else {
        EXIT_USAGE
    }
}

/// Settings and registry shared by every command
pub struct Context {
    pub settings: Settings,
    pub registry: Registry,
    /// Directory containing `rollout.kdl`; service paths are relative to it
    pub root: PathBuf,
    pub registry_path: PathBuf,
}

impl Context {
    /// Load settings and the registry, optionally narrowed to one service
    pub fn load(registry_path: Option<PathBuf>, service: Option<&str>) -> anyhow::Result<Self> {
        let settings = rollout_config::load_settings().context("failed to load settings")?;

        let cwd = std::env::current_dir().context("cannot read the current directory")?;
        let located = rollout_registry::locate_registry(registry_path.as_deref(), &cwd)?;
        let root = located.root();
        let registry_path = located.path;

        let mut registry = rollout_registry::parse_registry_file(&registry_path)
            .with_context(|| format!("failed to load {}", registry_path.display()))?;

        if let Some(name) = service {
            registry = match registry.only(name) {
                Some(single) => single,
                None => bail!(
                    "service '{}' is not in the registry (known: {})",
                    name,
                    registry.names().join(", ")
                ),
            };
        }

        Ok(Self {
            settings,
            registry,
            root,
            registry_path,
        })
    }

    /// Runs directory; relative paths are resolved against the registry root
    pub fn runs_dir(&self) -> PathBuf {
        let dir = self.settings.runs_dir();
        if dir.is_absolute() {
            dir
        } else {
            self.root.join(dir)
        }
    }
}

/// Print missing prerequisites; `false` means the run must not start
pub fn check_prerequisites(checker: &PrerequisiteChecker) -> bool {
    match checker.check() {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{}", "✗ Prerequisites missing".red().bold());
            for missing in &e.missing {
                eprintln!("  - {}", missing);
            }
            eprintln!();
            eprintln!("No service was touched.");
            false
        }
    }
}

/// Write the report; a failed write is reported but does not change the exit code
pub async fn persist_report(report: &DeploymentReport, runs_dir: &Path) {
    match report.persist(runs_dir).await {
        Ok(path) => println!("Report: {}", path.display().to_string().dimmed()),
        Err(e) => eprintln!("{} failed to write report: {}", "warning:".yellow(), e),
    }
}

fn outcome_label(outcome: DeployOutcome) -> colored::ColoredString {
    let text = outcome.to_string();
    match outcome {
        DeployOutcome::Succeeded => text.green(),
        DeployOutcome::NotAttempted => text.dimmed(),
        _ => text.red(),
    }
}

pub fn health_label(health: HealthStatus) -> colored::ColoredString {
    let text = health.to_string();
    match health {
        HealthStatus::Healthy => text.green(),
        HealthStatus::Degraded => text.yellow(),
        HealthStatus::Unreachable => text.red(),
        HealthStatus::Unknown => text.yellow(),
    }
}

/// Console summary printed after deploy and recovery runs
pub fn print_summary(report: &DeploymentReport) {
    println!();
    println!(
        "{} {} ({})",
        "Summary:".bold(),
        report.kind,
        report.commit.dimmed()
    );
    println!(
        "  {:<24} {:<20} {:<12} {:>8} {:>9}",
        "SERVICE", "DEPLOY", "HEALTH", "ATTEMPTS", "MACHINES"
    );

    for (name, service) in &report.services {
        let machines = service
            .machine_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:<24} {:<20} {:<12} {:>8} {:>9}",
            name.cyan(),
            outcome_label(service.deploy_outcome),
            health_label(service.health),
            service.attempts.len(),
            machines
        );
        if let Some(error) = &service.error {
            println!("      {} {}", "✗".red(), error);
        }
        for warning in &service.warnings {
            println!("      {} {}", "!".yellow(), warning);
        }
    }

    println!();
    if report.all_ok() {
        let message = match report.kind {
            ReportKind::Deploy => "✓ All services deployed and healthy",
            ReportKind::Recovery => "✓ All services healthy",
        };
        println!("{}", message.green().bold());
    } else {
        println!(
            "{} {}",
            "✗ Needs attention:".red().bold(),
            report.failed_services().join(", ")
        );
    }
}
