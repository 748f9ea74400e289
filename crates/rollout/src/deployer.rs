//! Deploy retry state machine
//!
//! ```text
//! Pending -> Attempting(1) -> Succeeded
//!                          -> Backoff -> Attempting(n + 1) -> ...
//!                          -> ExhaustedFailed   (after the last attempt)
//! ```
//!
//! Every attempt is bounded by the attempt timeout. The wait before attempt
//! `n + 1` is `base * 2^(n - 1)`; there is no wait after the last attempt.

use crate::runlog::RunLog;
use chrono::Utc;
use rollout_config::Settings;
use rollout_core::{AttemptOutcome, DeployOutcome, DeploymentAttempt, ServiceSpec, tail_lines};
use rollout_platform::{DeployRequest, Platform};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Attempt limits and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl BackoffPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: settings.backoff_base(),
            attempt_timeout: settings.attempt_timeout(),
        }
    }

    /// Wait after failed attempt `attempt` (1-based), `None` after the last one
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        Some(self.base_delay.saturating_mul(factor))
    }
}

/// Deployer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Pending,
    Attempting(u32),
    Backoff { next_attempt: u32, delay: Duration },
    Succeeded,
    ExhaustedFailed,
}

impl DeployState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployState::Succeeded | DeployState::ExhaustedFailed)
    }
}

/// Terminal outcome plus the full attempt history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub outcome: DeployOutcome,
    pub attempts: Vec<DeploymentAttempt>,
}

pub struct Deployer<'a> {
    platform: &'a dyn Platform,
    policy: BackoffPolicy,
    log_tail_lines: usize,
    run_log: &'a RunLog,
}

impl<'a> Deployer<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        policy: BackoffPolicy,
        log_tail_lines: usize,
        run_log: &'a RunLog,
    ) -> Self {
        Self {
            platform,
            policy,
            log_tail_lines,
            run_log,
        }
    }

    /// Drive one service to `Succeeded` or `ExhaustedFailed`
    pub async fn deploy(&self, service: &ServiceSpec, workdir: &Path) -> DeployResult {
        let mut attempts: Vec<DeploymentAttempt> = Vec::new();
        let mut state = DeployState::Pending;

        while !state.is_terminal() {
            state = match state {
                DeployState::Pending => DeployState::Attempting(1),
                DeployState::Attempting(n) => {
                    let attempt = self.attempt(service, workdir, n).await;
                    let outcome = attempt.outcome;
                    attempts.push(attempt);

                    if outcome == AttemptOutcome::Success {
                        DeployState::Succeeded
                    } else {
                        match self.policy.delay_after(n) {
                            Some(delay) => DeployState::Backoff {
                                next_attempt: n + 1,
                                delay,
                            },
                            None => DeployState::ExhaustedFailed,
                        }
                    }
                }
                DeployState::Backoff {
                    next_attempt,
                    delay,
                } => {
                    tracing::info!(
                        service = %service.name,
                        delay_secs = delay.as_secs(),
                        next_attempt,
                        "Backing off before next attempt"
                    );
                    sleep(delay).await;
                    DeployState::Attempting(next_attempt)
                }
                terminal => terminal,
            };
        }

        let outcome = if state == DeployState::Succeeded {
            tracing::info!(service = %service.name, attempts = attempts.len(), "Deploy succeeded");
            DeployOutcome::Succeeded
        } else {
            tracing::error!(
                service = %service.name,
                attempts = attempts.len(),
                "Deploy failed after all attempts"
            );
            DeployOutcome::ExhaustedFailed
        };

        DeployResult { outcome, attempts }
    }

    async fn attempt(&self, service: &ServiceSpec, workdir: &Path, n: u32) -> DeploymentAttempt {
        tracing::info!(
            service = %service.name,
            region = %service.primary_region,
            attempt = n,
            max_attempts = self.policy.max_attempts,
            "Deploying"
        );
        self.run_log.banner(&format!(
            "deploy {} attempt {}/{} (region {})",
            service.name, n, self.policy.max_attempts, service.primary_region
        ));

        let request = DeployRequest::new(service, workdir);
        let started_at = Utc::now();
        let result = timeout(self.policy.attempt_timeout, self.platform.deploy(&request)).await;
        let finished_at = Utc::now();

        let (outcome, output) = match result {
            Ok(Ok(output)) if output.success => (AttemptOutcome::Success, output.combined()),
            Ok(Ok(output)) => {
                let mut text = output.combined();
                if let Some(code) = output.exit_code {
                    text.push_str(&format!("\nexit code {}", code));
                }
                (AttemptOutcome::Failed, text)
            }
            Ok(Err(e)) => (AttemptOutcome::Failed, e.to_string()),
            Err(_) => (
                AttemptOutcome::TimedOut,
                format!(
                    "attempt timed out after {}s",
                    self.policy.attempt_timeout.as_secs()
                ),
            ),
        };

        self.run_log
            .output(&format!("{} attempt {} ({})", service.name, n, outcome), &output);
        if outcome != AttemptOutcome::Success {
            tracing::warn!(service = %service.name, attempt = n, %outcome, "Deploy attempt failed");
        }

        DeploymentAttempt {
            attempt: n,
            started_at,
            finished_at,
            outcome,
            log_excerpt: tail_lines(&output, self.log_tail_lines),
        }
    }
}
