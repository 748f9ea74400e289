//! rollout
//!
//! Sequential, multi-region deployment orchestrator. Services listed in
//! `rollout.kdl` are validated, built, deployed to their primary region with
//! retries, health checked and replicated into their secondary regions, one
//! service at a time in registry order.
//!
//! # Runs
//!
//! - **deploy**: the full pipeline ([`pipeline::Pipeline`])
//! - **recover**: restart-then-redeploy sweep ([`recovery::RecoveryAgent`])
//! - **monitor**: read-only health percentage ([`monitor::check_all`])
//!
//! Deploy and recovery runs write an append-only run log and a JSON report
//! under the runs directory.

pub mod deployer;
pub mod health;
pub mod monitor;
pub mod pipeline;
pub mod prereq;
pub mod record;
pub mod recovery;
pub mod report;
pub mod runlog;
pub mod scaler;

pub use deployer::{BackoffPolicy, DeployResult, DeployState, Deployer};
pub use health::{HealthCheck, HealthVerifier};
pub use monitor::{MonitorSummary, Severity};
pub use pipeline::Pipeline;
pub use prereq::{Missing, PrerequisiteChecker, PrerequisiteError};
pub use record::{ServiceRecord, Stage};
pub use recovery::RecoveryAgent;
pub use report::{DeploymentReport, ReportGenerator, ReportKind, ServiceReport};
pub use runlog::RunLog;
pub use scaler::{RegionScaler, ScaleOutcome};
