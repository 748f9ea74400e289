pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name
pub const SETTINGS_FILENAME: &str = "rollout.yaml";

/// Environment variable pointing directly at a settings file
pub const SETTINGS_PATH_ENV: &str = "ROLLOUT_SETTINGS_PATH";

/// Environment variable overriding the runs directory
pub const RUNS_DIR_ENV: &str = "ROLLOUT_RUNS_DIR";

/// Orchestrator settings
///
/// Every field has a default, so an empty file (or no file at all) yields the
/// standard rollout behaviour: 5 attempts, 900s per attempt, 60s doubling
/// backoff, 12 health polls 5s apart, 2 instances minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deploy attempts per service
    pub max_attempts: u32,

    /// Hard limit for a single deploy attempt
    pub attempt_timeout_secs: u64,

    /// Delay before the second attempt; doubles after every failure
    pub backoff_base_secs: u64,

    /// Health polls after a successful deploy
    pub health_polls: u32,

    /// Wait before each health poll
    pub health_interval_secs: u64,

    /// Minimum running instances for multi-region services
    pub min_instances: u32,

    /// Lines of output kept in attempt excerpts and report log tails
    pub log_tail_lines: usize,

    /// Environment variables that must be set and non-empty
    pub required_credentials: Vec<String>,

    /// Programs that must resolve on PATH
    pub required_tools: Vec<String>,

    /// Where run logs and reports are written
    pub runs_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout_secs: 900,
            backoff_base_secs: 60,
            health_polls: 12,
            health_interval_secs: 5,
            min_instances: 2,
            log_tail_lines: 20,
            required_credentials: vec![
                "PLATFORM_API_TOKEN".to_string(),
                "GITHUB_TOKEN".to_string(),
            ],
            required_tools: vec!["flyctl".to_string(), "git".to_string()],
            runs_dir: PathBuf::from(".rollout/runs"),
        }
    }
}

impl Settings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self> {
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|source| ConfigError::InvalidSettings {
                path: origin.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.health_polls == 0 {
            return Err(ConfigError::InvalidValue(
                "health_polls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs directory, honouring `ROLLOUT_RUNS_DIR`
    pub fn runs_dir(&self) -> PathBuf {
        match std::env::var(RUNS_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.runs_dir.clone(),
        }
    }
}

/// Global rollout config directory (`~/.config/rollout`)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("rollout");
    Ok(config_dir)
}

/// Find the settings file
///
/// Search order:
/// 1. `ROLLOUT_SETTINGS_PATH`
/// 2. `./rollout.yaml`
/// 3. `./.rollout/rollout.yaml`
/// 4. `~/.config/rollout/rollout.yaml`
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(path = %path.display(), "ROLLOUT_SETTINGS_PATH is set but file does not exist");
    }

    let current_dir = std::env::current_dir()?;

    let local = current_dir.join(SETTINGS_FILENAME);
    if local.exists() {
        return Ok(Some(local));
    }

    let hidden = current_dir.join(".rollout").join(SETTINGS_FILENAME);
    if hidden.exists() {
        return Ok(Some(hidden));
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join(SETTINGS_FILENAME);
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// Load settings, falling back to defaults when no file exists
pub fn load_settings() -> Result<Settings> {
    match find_settings_file()? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading settings");
            let content = std::fs::read_to_string(&path)?;
            Settings::from_yaml(&content, &path)
        }
        None => {
            tracing::debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}
