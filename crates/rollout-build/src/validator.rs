//! Static service checks
//!
//! Nothing here touches the network or the platform; every check reads files
//! under the service directory. All failures are collected so the operator
//! sees the full list at once.

use crate::error::ValidationError;
use rollout_core::{CriticalDependency, Manifest, ServiceSpec};
use semver::Version;
use std::path::Path;

/// Validate a service rooted at `workdir`
pub fn validate_service(
    service: &ServiceSpec,
    workdir: &Path,
) -> std::result::Result<(), Vec<ValidationError>> {
    if !workdir.is_dir() {
        return Err(vec![ValidationError::ServiceDirNotFound(
            workdir.to_path_buf(),
        )]);
    }

    let mut errors = Vec::new();

    if let Err(e) = check_descriptor(service, workdir) {
        errors.push(e);
    }

    if let Some(manifest) = &service.manifest {
        errors.extend(check_manifest(manifest, &service.requires, workdir));
    }

    if errors.is_empty() {
        tracing::debug!(service = %service.name, "Validation passed");
        Ok(())
    } else {
        Err(errors)
    }
}

/// The descriptor must exist, parse as TOML and agree with the registry on
/// the primary region when it names one.
fn check_descriptor(
    service: &ServiceSpec,
    workdir: &Path,
) -> std::result::Result<(), ValidationError> {
    let path = workdir.join(&service.descriptor);
    if !path.is_file() {
        return Err(ValidationError::DescriptorNotFound(path));
    }

    let malformed = |message: String| ValidationError::DescriptorMalformed {
        path: path.clone(),
        message,
    };

    let content = std::fs::read_to_string(&path).map_err(|e| malformed(e.to_string()))?;
    let table: toml::Table = content.parse().map_err(|e: toml::de::Error| malformed(e.to_string()))?;

    if let Some(app) = table.get("app") {
        if !app.is_str() {
            return Err(malformed("`app` must be a string".to_string()));
        }
    }

    if let Some(region) = table.get("primary_region") {
        let region = region
            .as_str()
            .ok_or_else(|| malformed("`primary_region` must be a string".to_string()))?;
        if region != service.primary_region.as_str() {
            return Err(ValidationError::RegionMismatch {
                expected: service.primary_region.to_string(),
                found: region.to_string(),
            });
        }
    }

    Ok(())
}

fn check_manifest(
    manifest: &Manifest,
    requires: &[CriticalDependency],
    workdir: &Path,
) -> Vec<ValidationError> {
    let path = workdir.join(&manifest.path);
    if !path.is_file() {
        return vec![ValidationError::ManifestNotFound(path)];
    }

    let document = match read_json(&path) {
        Ok(document) => document,
        Err(message) => return vec![ValidationError::ManifestMalformed { path, message }],
    };

    let mut errors = Vec::new();

    for dependency in requires {
        match declared_version(&document, &dependency.name) {
            None => errors.push(ValidationError::DependencyMissing {
                name: dependency.name.clone(),
                manifest: manifest.path.clone(),
            }),
            Some(declared) => {
                let satisfied = lowest_version(declared)
                    .map(|v| v >= dependency.min_version)
                    .unwrap_or(false);
                if !satisfied {
                    errors.push(ValidationError::DependencyTooOld {
                        name: dependency.name.clone(),
                        required: dependency.min_version.to_string(),
                        found: declared.to_string(),
                    });
                }
            }
        }
    }

    if let Some(lockfile) = &manifest.lockfile {
        errors.extend(check_lockfile(&workdir.join(lockfile), requires));
    }

    errors
}

/// The lockfile must exist; when it is npm-style JSON, every critical
/// dependency must be resolved there at or above its minimum.
fn check_lockfile(path: &Path, requires: &[CriticalDependency]) -> Vec<ValidationError> {
    if !path.is_file() {
        return vec![ValidationError::LockfileNotFound(path.to_path_buf())];
    }

    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return Vec::new();
    }

    let document = match read_json(path) {
        Ok(document) => document,
        Err(message) => {
            return vec![ValidationError::ManifestMalformed {
                path: path.to_path_buf(),
                message,
            }];
        }
    };

    let mut errors = Vec::new();
    for dependency in requires {
        let Some(resolved) = resolved_version(&document, &dependency.name) else {
            errors.push(ValidationError::LockfileMissingDependency {
                name: dependency.name.clone(),
                lockfile: path.to_path_buf(),
            });
            continue;
        };

        // Non-semver pins (git URLs, aliases) are left to the package manager
        let Ok(version) = Version::parse(resolved) else {
            continue;
        };
        if version < dependency.min_version {
            errors.push(ValidationError::LockfileOutdated {
                name: dependency.name.clone(),
                required: dependency.min_version.to_string(),
                resolved: resolved.to_string(),
            });
        }
    }
    errors
}

fn read_json(path: &Path) -> std::result::Result<serde_json::Value, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

/// Version requirement declared in `dependencies` or `devDependencies`
fn declared_version<'a>(document: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    ["dependencies", "devDependencies"]
        .iter()
        .find_map(|section| document.get(section)?.get(name)?.as_str())
}

/// Version pinned by an npm lockfile (v2/v3 `packages`, or v1 `dependencies`)
fn resolved_version<'a>(document: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    let key = format!("node_modules/{}", name);
    document
        .get("packages")
        .and_then(|p| p.get(&key))
        .or_else(|| document.get("dependencies").and_then(|d| d.get(name)))
        .and_then(|entry| entry.get("version"))
        .and_then(|v| v.as_str())
}

/// Lowest version admitted by a declared requirement such as `^14.1.0`,
/// `~14.1`, `>=14` or `14.2.3`. Tags and URLs yield `None`.
fn lowest_version(declared: &str) -> Option<Version> {
    let first = declared.split_whitespace().next()?;
    let bare = first.trim_start_matches(['^', '~', '>', '=', 'v']);
    let core = bare.split(['-', '+']).next()?;

    let mut parts = core.split('.').map(|p| match p {
        "x" | "X" | "*" => Some(0),
        _ => p.parse::<u64>().ok(),
    });
    let major = parts.next()??;
    let minor = parts.next().unwrap_or(Some(0))?;
    let patch = parts.next().unwrap_or(Some(0))?;

    Some(Version::new(major, minor, patch))
}
