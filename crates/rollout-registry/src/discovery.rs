//! Locating `rollout.kdl`
//!
//! An explicitly given path (the `--registry` flag) wins, then
//! `ROLLOUT_REGISTRY_PATH`, then the first `rollout.kdl` found walking up
//! from the starting directory. A path that was named explicitly must exist;
//! only the search is allowed to come up empty.

use crate::error::{RegistryError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Registry file name
pub const REGISTRY_FILENAME: &str = "rollout.kdl";

/// Environment variable pointing directly at a registry file
pub const REGISTRY_PATH_ENV: &str = "ROLLOUT_REGISTRY_PATH";

/// How a registry path was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    Flag,
    Env,
    Search,
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrySource::Flag => write!(f, "--registry"),
            RegistrySource::Env => write!(f, "{}", REGISTRY_PATH_ENV),
            RegistrySource::Search => write!(f, "directory search"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRegistry {
    pub path: PathBuf,
    pub source: RegistrySource,
}

impl LocatedRegistry {
    /// Directory that service paths are resolved against
    pub fn root(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Resolve the registry for a run started in `start_dir`
pub fn locate_registry(explicit: Option<&Path>, start_dir: &Path) -> Result<LocatedRegistry> {
    let env_path = std::env::var_os(REGISTRY_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    locate_with(explicit, env_path, start_dir)
}

fn locate_with(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    start_dir: &Path,
) -> Result<LocatedRegistry> {
    let named = explicit
        .map(|p| (p.to_path_buf(), RegistrySource::Flag))
        .or_else(|| env_path.map(|p| (p, RegistrySource::Env)));

    if let Some((path, source)) = named {
        if !path.is_file() {
            return Err(RegistryError::Missing {
                path,
                source_name: source.to_string(),
            });
        }
        tracing::debug!(path = %path.display(), %source, "Using registry");
        return Ok(LocatedRegistry { path, source });
    }

    let path = search_upward(start_dir).ok_or(RegistryError::NotFound)?;
    tracing::debug!(path = %path.display(), "Found registry");
    Ok(LocatedRegistry {
        path,
        source: RegistrySource::Search,
    })
}

/// First `rollout.kdl` in `start_dir` or one of its ancestors
pub fn search_upward(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(REGISTRY_FILENAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn project() -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join(REGISTRY_FILENAME), "registry \"acme\"").unwrap();
        temp_dir
    }

    #[test]
    fn test_search_from_nested_directory() {
        let temp_dir = project();
        let nested = temp_dir.path().join("apps").join("web");
        std::fs::create_dir_all(&nested).unwrap();

        let located = locate_with(None, None, &nested).unwrap();
        assert_eq!(located.path, temp_dir.path().join(REGISTRY_FILENAME));
        assert_eq!(located.source, RegistrySource::Search);
        assert_eq!(located.root(), temp_dir.path());
    }

    #[test]
    fn test_search_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = locate_with(None, None, temp_dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound));
    }

    #[test]
    fn test_flag_beats_env_and_search() {
        let searched = project();
        let other = tempfile::tempdir().unwrap();
        let flagged = other.path().join("prod.kdl");
        let from_env = other.path().join("staging.kdl");
        std::fs::write(&flagged, "registry \"prod\"").unwrap();
        std::fs::write(&from_env, "registry \"staging\"").unwrap();

        let located = locate_with(Some(&flagged), Some(from_env.clone()), searched.path()).unwrap();
        assert_eq!(located.path, flagged);
        assert_eq!(located.source, RegistrySource::Flag);

        let located = locate_with(None, Some(from_env.clone()), searched.path()).unwrap();
        assert_eq!(located.path, from_env);
        assert_eq!(located.source, RegistrySource::Env);
    }

    #[test]
    fn test_named_path_must_exist() {
        let searched = project();
        let missing = searched.path().join("missing.kdl");

        let err = locate_with(None, Some(missing.clone()), searched.path()).unwrap_err();
        match err {
            RegistryError::Missing { path, source_name } => {
                assert_eq!(path, missing);
                assert_eq!(source_name, REGISTRY_PATH_ENV);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn test_locate_reads_env_var() {
        let searched = project();
        let other = tempfile::tempdir().unwrap();
        let custom = other.path().join("custom.kdl");
        std::fs::write(&custom, "registry \"custom\"").unwrap();

        temp_env::with_var(REGISTRY_PATH_ENV, Some(custom.as_os_str()), || {
            let located = locate_registry(None, searched.path()).unwrap();
            assert_eq!(located.path, custom);
        });
    }

    #[test]
    fn test_relative_path_root() {
        let located = LocatedRegistry {
            path: PathBuf::from(REGISTRY_FILENAME),
            source: RegistrySource::Flag,
        };
        assert_eq!(located.root(), PathBuf::from("."));
    }
}
