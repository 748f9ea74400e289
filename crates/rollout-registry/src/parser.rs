//! rollout.kdl parser
//!
//! Parses the registry KDL syntax into an ordered [`Registry`]. Document
//! order is deployment order.

use crate::error::{RegistryError, Result};
use crate::model::Registry;
use kdl::{KdlDocument, KdlNode};
use rollout_core::{BuildStep, CriticalDependency, Manifest, Region, ServiceSpec};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Parse a registry file
pub fn parse_registry_file(path: &Path) -> Result<Registry> {
    let content = std::fs::read_to_string(path)?;
    parse_registry(&content)
}

/// Parse registry KDL text
pub fn parse_registry(content: &str) -> Result<Registry> {
    let doc: KdlDocument = content.parse()?;

    let mut registry = Registry::default();
    let mut seen: HashSet<String> = HashSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "registry" => {
                if let Some(name) = first_string(node) {
                    registry.name = name.to_string();
                }
            }
            "service" => {
                let service = parse_service(node)?;

                if !seen.insert(service.name.clone()) {
                    return Err(RegistryError::DuplicateService(service.name));
                }

                // `after` may only point backwards: the list order is the dependency order
                for dependency in &service.after {
                    if dependency == &service.name || registry.get(dependency).is_none() {
                        return Err(RegistryError::UnknownDependency {
                            service: service.name.clone(),
                            dependency: dependency.clone(),
                        });
                    }
                }

                registry.services.push(service);
            }
            other => {
                tracing::debug!("Skipping unknown registry node '{}'", other);
            }
        }
    }

    if registry.name.is_empty() {
        return Err(RegistryError::InvalidConfig(
            "a `registry \"<name>\"` node is required".to_string(),
        ));
    }

    Ok(registry)
}

/// Parse a `service` node
fn parse_service(node: &KdlNode) -> Result<ServiceSpec> {
    let name = first_string(node)
        .ok_or_else(|| RegistryError::InvalidConfig("service requires a name".to_string()))?
        .to_string();

    let invalid = |source| RegistryError::InvalidService {
        service: name.clone(),
        source,
    };

    let mut path: Option<PathBuf> = None;
    let mut app = None;
    let mut descriptor = None;
    let mut regions: Vec<Region> = Vec::new();
    let mut after = Vec::new();
    let mut build = None;
    let mut manifest = None;
    let mut requires = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "path" => path = first_string(child).map(PathBuf::from),
                "app" => app = first_string(child).map(|s| s.to_string()),
                "descriptor" => descriptor = first_string(child).map(PathBuf::from),
                "regions" => {
                    for code in positional_strings(child) {
                        regions.push(Region::parse(code).map_err(invalid)?);
                    }
                }
                "after" => {
                    after.extend(positional_strings(child).into_iter().map(String::from));
                }
                "build" => {
                    let command = first_string(child).ok_or_else(|| {
                        RegistryError::InvalidConfig(format!(
                            "service '{}': build requires a command",
                            name
                        ))
                    })?;
                    build = Some(BuildStep {
                        command: command.to_string(),
                        artifact: property_string(child, "artifact").map(PathBuf::from),
                    });
                }
                "manifest" => {
                    let manifest_path = first_string(child).ok_or_else(|| {
                        RegistryError::InvalidConfig(format!(
                            "service '{}': manifest requires a path",
                            name
                        ))
                    })?;
                    manifest = Some(Manifest {
                        path: PathBuf::from(manifest_path),
                        lockfile: property_string(child, "lockfile").map(PathBuf::from),
                    });
                }
                "require" => {
                    let dep_name = first_string(child);
                    let min = property_string(child, "min");
                    match (dep_name, min) {
                        (Some(dep_name), Some(min)) => {
                            requires.push(CriticalDependency::new(dep_name, min).map_err(invalid)?);
                        }
                        _ => {
                            return Err(RegistryError::InvalidConfig(format!(
                                "service '{}': require needs a name and min=\"<version>\"",
                                name
                            )));
                        }
                    }
                }
                other => {
                    tracing::warn!("service '{}': ignoring unknown field '{}'", name, other);
                }
            }
        }
    }

    let path = path.ok_or_else(|| {
        RegistryError::InvalidConfig(format!("service '{}' requires a path", name))
    })?;

    if !requires.is_empty() && manifest.is_none() {
        return Err(RegistryError::InvalidConfig(format!(
            "service '{}' declares `require` without a `manifest`",
            name
        )));
    }

    let mut service = ServiceSpec::new(name.clone(), path, regions).map_err(invalid)?;
    service.app = app;
    if let Some(descriptor) = descriptor {
        service.descriptor = descriptor;
    }
    service.after = after;
    service.build = build;
    service.manifest = manifest;
    service.requires = requires;

    Ok(service)
}

/// First positional string argument
fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

/// All positional string arguments
fn positional_strings(node: &KdlNode) -> Vec<&str> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .collect()
}

/// Named string property (`key="value"`)
fn property_string<'a>(node: &'a KdlNode, key: &str) -> Option<&'a str> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
}
