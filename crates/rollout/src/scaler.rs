//! Secondary-region replication

use rollout_core::{Region, ServiceSpec};
use rollout_platform::{Platform, ReplicaOutcome};

/// What the scaler did for one service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleOutcome {
    pub replicas: Vec<(Region, ReplicaOutcome)>,
    /// Instance count after scaling, when the platform reported one
    pub instances: Option<u32>,
    /// Replication or scaling failures; none of them fail the service
    pub warnings: Vec<String>,
}

pub struct RegionScaler<'a> {
    platform: &'a dyn Platform,
    min_instances: u32,
}

impl<'a> RegionScaler<'a> {
    pub fn new(platform: &'a dyn Platform, min_instances: u32) -> Self {
        Self {
            platform,
            min_instances,
        }
    }

    /// Replicate into every secondary region, then enforce the instance floor
    ///
    /// Single-region services are left untouched.
    pub async fn scale(&self, service: &ServiceSpec) -> ScaleOutcome {
        let mut outcome = ScaleOutcome::default();
        if !service.is_multi_region() {
            return outcome;
        }

        for region in &service.secondary_regions {
            match self.platform.replicate(service, region).await {
                Ok(result) => {
                    tracing::info!(service = %service.name, %region, ?result, "Replica ensured");
                    outcome.replicas.push((region.clone(), result));
                }
                Err(e) => {
                    let warning = format!("replication to {} failed: {}", region, e);
                    tracing::warn!(service = %service.name, "{}", warning);
                    outcome.warnings.push(warning);
                }
            }
        }

        match self
            .platform
            .ensure_min_instances(service, self.min_instances)
            .await
        {
            Ok(count) => outcome.instances = Some(count),
            Err(e) => {
                let warning = format!(
                    "could not raise instance count to {}: {}",
                    self.min_instances, e
                );
                tracing::warn!(service = %service.name, "{}", warning);
                outcome.warnings.push(warning);
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_platform::testing::{PlatformCall, ScriptedPlatform};

    fn service(regions: &[&str]) -> ServiceSpec {
        let regions = regions.iter().map(|r| Region::parse(r).unwrap()).collect();
        ServiceSpec::new("web", "web", regions).unwrap()
    }

    #[tokio::test]
    async fn test_replicates_each_secondary_once() {
        let platform = ScriptedPlatform::new();
        let scaler = RegionScaler::new(&platform, 2);

        let outcome = scaler.scale(&service(&["ord", "iad", "sjc"])).await;

        let replicated: Vec<String> = platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Replicate { region, .. } => Some(region),
                _ => None,
            })
            .collect();
        assert_eq!(replicated, vec!["iad", "sjc"]);
        assert_eq!(outcome.replicas.len(), 2);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.instances, Some(3));
    }

    #[tokio::test]
    async fn test_replication_failure_is_warning() {
        let platform = ScriptedPlatform::new().with_failing_replica("web", "sjc");
        let scaler = RegionScaler::new(&platform, 2);

        let outcome = scaler.scale(&service(&["ord", "iad", "sjc"])).await;
        assert_eq!(outcome.replicas.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("sjc"));
        assert_eq!(outcome.instances, Some(2));
    }

    #[tokio::test]
    async fn test_single_region_untouched() {
        let platform = ScriptedPlatform::new();
        let scaler = RegionScaler::new(&platform, 2);

        let outcome = scaler.scale(&service(&["ord"])).await;
        assert_eq!(outcome, ScaleOutcome::default());
        assert!(platform.calls().is_empty());
    }
}
