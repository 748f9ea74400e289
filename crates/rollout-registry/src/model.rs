//! Registry data model

use rollout_core::ServiceSpec;
use serde::{Deserialize, Serialize};

/// Ordered table of deployable services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Registry name (project identifier)
    pub name: String,

    /// Services in deployment order
    pub services: Vec<ServiceSpec>,
}

impl Registry {
    /// Look up a service by name
    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.services.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Restrict the registry to a single service, keeping the name
    pub fn only(&self, name: &str) -> Option<Registry> {
        self.get(name).map(|service| Registry {
            name: self.name.clone(),
            services: vec![service.clone()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::Region;

    fn service(name: &str) -> ServiceSpec {
        ServiceSpec::new(name, name, vec![Region::parse("ord").unwrap()]).unwrap()
    }

    fn sample_registry() -> Registry {
        Registry {
            name: "acme".to_string(),
            services: vec![service("db"), service("api"), service("web")],
        }
    }

    #[test]
    fn test_lookup() {
        let registry = sample_registry();
        assert!(registry.get("api").is_some());
        assert!(registry.get("worker").is_none());
        assert_eq!(registry.names(), vec!["db", "api", "web"]);
    }

    #[test]
    fn test_only() {
        let registry = sample_registry();
        let single = registry.only("api").unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.name, "acme");
        assert!(registry.only("missing").is_none());
    }
}
