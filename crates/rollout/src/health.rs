//! Post-deploy health verification
//!
//! Polls a bounded number of times, waiting the poll interval before each
//! poll. Started ends polling as Healthy, Stopped or Crashed ends it as
//! Unreachable, and a status that stays unavailable for every poll ends as
//! Unknown. The result is advisory: nothing here triggers a redeploy.

use rollout_config::Settings;
use rollout_core::{HealthStatus, ServiceSpec, ServiceState};
use rollout_platform::{Platform, StatusSnapshot};
use std::time::Duration;
use tokio::time::sleep;

/// Outcome of a verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheck {
    pub status: HealthStatus,
    /// Polls performed
    pub polls: u32,
    pub last: StatusSnapshot,
}

pub struct HealthVerifier<'a> {
    platform: &'a dyn Platform,
    polls: u32,
    interval: Duration,
}

impl<'a> HealthVerifier<'a> {
    pub fn new(platform: &'a dyn Platform, polls: u32, interval: Duration) -> Self {
        Self {
            platform,
            polls,
            interval,
        }
    }

    pub fn from_settings(platform: &'a dyn Platform, settings: &Settings) -> Self {
        Self::new(platform, settings.health_polls, settings.health_interval())
    }

    /// Poll until a terminal state or the poll budget runs out
    pub async fn verify(&self, service: &ServiceSpec) -> HealthCheck {
        let mut last = StatusSnapshot::unavailable();

        for poll in 1..=self.polls {
            sleep(self.interval).await;
            last = observe(self.platform, service).await;

            let status = match last.state {
                ServiceState::Started => HealthStatus::Healthy,
                ServiceState::Stopped | ServiceState::Crashed => HealthStatus::Unreachable,
                ServiceState::Unavailable => {
                    tracing::debug!(service = %service.name, poll, "Status unavailable");
                    continue;
                }
            };

            tracing::info!(service = %service.name, state = %last.state, %status, poll, "Health verified");
            return HealthCheck {
                status,
                polls: poll,
                last,
            };
        }

        tracing::warn!(
            service = %service.name,
            polls = self.polls,
            "Health check ambiguous: status stayed unavailable"
        );
        HealthCheck {
            status: HealthStatus::Unknown,
            polls: self.polls,
            last,
        }
    }
}

/// Single status observation; query errors count as unavailable
pub async fn observe(platform: &dyn Platform, service: &ServiceSpec) -> StatusSnapshot {
    match platform.status(service).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!(service = %service.name, error = %e, "Status query failed");
            StatusSnapshot::unavailable()
        }
    }
}

/// Classify one observation, including partial availability
pub fn classify(snapshot: &StatusSnapshot) -> HealthStatus {
    match snapshot.machine_count {
        Some(total) => HealthStatus::from_counts(snapshot.state, snapshot.started_count, total),
        None => HealthStatus::from_state(snapshot.state),
    }
}
