//! Health classification

use serde::{Deserialize, Serialize};

/// Observed state of a service as reported by the platform
///
/// Every platform status response maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// At least one instance is running
    Started,
    /// Instances exist but none is running
    Stopped,
    /// Instances failed or crashed
    Crashed,
    /// The status could not be determined
    Unavailable,
}

impl ServiceState {
    /// Whether this state ends health polling
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ServiceState::Unavailable)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Started => write!(f, "started"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::Crashed => write!(f, "crashed"),
            ServiceState::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Classified liveness of a deployed service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    /// Running, but some instances are not
    Degraded,
    Unreachable,
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Classify a single observation
    pub fn from_state(state: ServiceState) -> Self {
        match state {
            ServiceState::Started => HealthStatus::Healthy,
            ServiceState::Stopped | ServiceState::Crashed => HealthStatus::Unreachable,
            ServiceState::Unavailable => HealthStatus::Unknown,
        }
    }

    /// Classify an observation that also carries instance counts
    pub fn from_counts(state: ServiceState, started: u32, total: u32) -> Self {
        match HealthStatus::from_state(state) {
            HealthStatus::Healthy if started < total => HealthStatus::Degraded,
            other => other,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unreachable => write!(f, "unreachable"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}
