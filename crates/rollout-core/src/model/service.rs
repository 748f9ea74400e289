//! Service definitions

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default deployment descriptor file name inside a service directory
pub const DEFAULT_DESCRIPTOR: &str = "fly.toml";

/// Region code such as `ord`, `iad` or `sjc`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    /// Parse a region code, rejecting anything that is not lowercase alphanumeric
    pub fn parse(code: &str) -> Result<Self> {
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !valid {
            return Err(CoreError::InvalidRegion(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Region {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Region {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Region::parse(&value)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0
    }
}

/// Build step for services that ship a compiled artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Command line, e.g. `npm run build`
    pub command: String,

    /// Artifact path (relative to the service directory) expected after the build
    pub artifact: Option<PathBuf>,
}

/// Build manifest that lists the service's dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest path relative to the service directory, e.g. `package.json`
    pub path: PathBuf,

    /// Lockfile path relative to the service directory
    pub lockfile: Option<PathBuf>,
}

/// Dependency that must be present at or above a minimum version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalDependency {
    pub name: String,
    pub min_version: semver::Version,
}

impl CriticalDependency {
    pub fn new(name: impl Into<String>, min_version: &str) -> Result<Self> {
        let name = name.into();
        let min_version =
            semver::Version::parse(min_version).map_err(|source| CoreError::InvalidVersion {
                name: name.clone(),
                source,
            })?;
        Ok(Self { name, min_version })
    }
}

/// A deployable unit
///
/// KDL form:
/// ```kdl
/// service "web" {
///     path "apps/web"
///     regions "ord" "iad" "sjc"
///     build "npm run build" artifact=".next"
///     manifest "package.json" lockfile="package-lock.json"
///     require "next" min="14.0.0"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name
    pub name: String,

    /// Platform application name, defaults to `name`
    pub app: Option<String>,

    /// Source directory relative to the registry root
    pub path: PathBuf,

    /// Deployment descriptor relative to `path`
    pub descriptor: PathBuf,

    /// Region targeted by every deploy attempt
    pub primary_region: Region,

    /// Regions that receive replicas after a successful deploy
    pub secondary_regions: Vec<Region>,

    /// Earlier services this one expects to be live
    pub after: Vec<String>,

    pub build: Option<BuildStep>,

    pub manifest: Option<Manifest>,

    pub requires: Vec<CriticalDependency>,
}

impl ServiceSpec {
    /// Create a service from its ordered region list (first entry is primary)
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        regions: Vec<Region>,
    ) -> Result<Self> {
        let name = name.into();
        let mut regions = regions.into_iter();
        let primary_region = regions.next().ok_or_else(|| {
            CoreError::InvalidService(format!("service '{}' declares no regions", name))
        })?;

        let mut secondary_regions: Vec<Region> = Vec::new();
        for region in regions {
            if region == primary_region || secondary_regions.contains(&region) {
                return Err(CoreError::InvalidService(format!(
                    "service '{}' lists region '{}' more than once",
                    name, region
                )));
            }
            secondary_regions.push(region);
        }

        Ok(Self {
            name,
            app: None,
            path: path.into(),
            descriptor: PathBuf::from(DEFAULT_DESCRIPTOR),
            primary_region,
            secondary_regions,
            after: Vec::new(),
            build: None,
            manifest: None,
            requires: Vec::new(),
        })
    }

    /// Application name on the platform
    pub fn app_name(&self) -> &str {
        self.app.as_deref().unwrap_or(&self.name)
    }

    /// All regions in declaration order
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        std::iter::once(&self.primary_region).chain(self.secondary_regions.iter())
    }

    pub fn is_multi_region(&self) -> bool {
        !self.secondary_regions.is_empty()
    }

    pub fn needs_build(&self) -> bool {
        self.build.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(codes: &[&str]) -> Vec<Region> {
        codes.iter().map(|c| Region::parse(c).unwrap()).collect()
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(Region::parse("ord").unwrap().as_str(), "ord");
        assert!(Region::parse("ORD").is_err());
        assert!(Region::parse("").is_err());
        assert!(Region::parse("us-east").is_err());
    }

    #[test]
    fn test_region_serde_rejects_invalid() {
        let ok: Region = serde_json::from_str("\"iad\"").unwrap();
        assert_eq!(ok.as_str(), "iad");
        assert!(serde_json::from_str::<Region>("\"Bad Region\"").is_err());
    }

    #[test]
    fn test_service_primary_and_secondary() {
        let svc = ServiceSpec::new("web", "apps/web", regions(&["ord", "iad", "sjc"])).unwrap();
        assert_eq!(svc.primary_region.as_str(), "ord");
        assert_eq!(svc.secondary_regions.len(), 2);
        assert!(svc.is_multi_region());

        let all: Vec<&str> = svc.regions().map(|r| r.as_str()).collect();
        assert_eq!(all, vec!["ord", "iad", "sjc"]);
    }

    #[test]
    fn test_service_requires_region() {
        let err = ServiceSpec::new("api", "api", Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidService(_)));
    }

    #[test]
    fn test_service_rejects_duplicate_region() {
        let err = ServiceSpec::new("api", "api", regions(&["ord", "iad", "ord"])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidService(_)));
    }

    #[test]
    fn test_app_name_defaults_to_service_name() {
        let mut svc = ServiceSpec::new("api", "api", regions(&["ord"])).unwrap();
        assert_eq!(svc.app_name(), "api");
        svc.app = Some("acme-api".to_string());
        assert_eq!(svc.app_name(), "acme-api");
        assert!(!svc.is_multi_region());
    }

    #[test]
    fn test_critical_dependency_version() {
        let dep = CriticalDependency::new("next", "14.1.0").unwrap();
        assert_eq!(dep.min_version, semver::Version::new(14, 1, 0));
        assert!(CriticalDependency::new("next", "fourteen").is_err());
    }
}
