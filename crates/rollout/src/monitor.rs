//! Read-only health monitor

use crate::health::{classify, observe};
use rollout_core::HealthStatus;
use rollout_platform::{Platform, StatusSnapshot};
use rollout_registry::Registry;

/// Overall severity of a monitor run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// At least 80% healthy
    Ok,
    /// 50% to 79% healthy
    Warning,
    /// Below 50% healthy
    Critical,
}

impl Severity {
    pub fn from_percentage(percent: u32) -> Self {
        match percent {
            80.. => Severity::Ok,
            50..=79 => Severity::Warning,
            _ => Severity::Critical,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
        }
    }
}

/// One service's observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEntry {
    pub name: String,
    pub health: HealthStatus,
    pub snapshot: StatusSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub entries: Vec<MonitorEntry>,
}

impl MonitorSummary {
    pub fn healthy(&self) -> usize {
        self.entries.iter().filter(|e| e.health.is_healthy()).count()
    }

    /// Healthy share, rounded down; an empty registry counts as fully healthy
    pub fn percentage(&self) -> u32 {
        if self.entries.is_empty() {
            return 100;
        }
        (self.healthy() * 100 / self.entries.len()) as u32
    }

    pub fn severity(&self) -> Severity {
        Severity::from_percentage(self.percentage())
    }
}

/// Observe every service once, without changing anything
pub async fn check_all(platform: &dyn Platform, registry: &Registry) -> MonitorSummary {
    let mut entries = Vec::with_capacity(registry.len());
    for service in registry.iter() {
        let snapshot = observe(platform, service).await;
        let health = classify(&snapshot);
        tracing::debug!(service = %service.name, %health, "Observed");
        entries.push(MonitorEntry {
            name: service.name.clone(),
            health,
            snapshot,
        });
    }
    MonitorSummary { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::{Region, ServiceSpec, ServiceState};
    use rollout_platform::testing::{PlatformCall, ScriptedPlatform};

    fn registry(names: &[&str]) -> Registry {
        Registry {
            name: "acme".to_string(),
            services: names
                .iter()
                .map(|n| ServiceSpec::new(*n, *n, vec![Region::parse("ord").unwrap()]).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(Severity::from_percentage(100).exit_code(), 0);
        assert_eq!(Severity::from_percentage(80).exit_code(), 0);
        assert_eq!(Severity::from_percentage(79).exit_code(), 1);
        assert_eq!(Severity::from_percentage(50).exit_code(), 1);
        assert_eq!(Severity::from_percentage(49).exit_code(), 2);
        assert_eq!(Severity::from_percentage(0).exit_code(), 2);
    }

    #[tokio::test]
    async fn test_monitor_counts_only_healthy() {
        let platform = ScriptedPlatform::new()
            .with_state("b", ServiceState::Crashed)
            .with_instances("c", 2, 1)
            .with_statuses("d", [ServiceState::Unavailable]);

        let summary = check_all(&platform, &registry(&["a", "b", "c", "d"])).await;

        let healths: Vec<HealthStatus> = summary.entries.iter().map(|e| e.health).collect();
        assert_eq!(
            healths,
            vec![
                HealthStatus::Healthy,
                HealthStatus::Unreachable,
                HealthStatus::Degraded,
                HealthStatus::Unknown,
            ]
        );
        assert_eq!(summary.percentage(), 25);
        assert_eq!(summary.severity(), Severity::Critical);
    }

    #[tokio::test]
    async fn test_monitor_is_read_only() {
        let platform = ScriptedPlatform::new().with_state("b", ServiceState::Stopped);
        let summary = check_all(&platform, &registry(&["a", "b"])).await;

        assert_eq!(summary.severity(), Severity::Warning);
        assert!(
            platform
                .calls()
                .iter()
                .all(|c| matches!(c, PlatformCall::Status { .. }))
        );
    }

    #[test]
    fn test_empty_registry_is_ok() {
        let summary = MonitorSummary {
            entries: Vec::new(),
        };
        assert_eq!(summary.severity(), Severity::Ok);
    }
}
