//! Prerequisite checks
//!
//! Runs before any service is touched. Reads the environment and PATH only.

use rollout_build::build_program;
use rollout_config::Settings;
use rollout_registry::Registry;
use thiserror::Error;

/// A single missing prerequisite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Credential(String),
    Tool(String),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Credential(name) => write!(f, "credential {} is not set", name),
            Missing::Tool(name) => write!(f, "tool {} not found on PATH", name),
        }
    }
}

#[derive(Debug, Error)]
#[error("{} prerequisite(s) missing: {}", .missing.len(), join(.missing))]
pub struct PrerequisiteError {
    pub missing: Vec<Missing>,
}

fn join(missing: &[Missing]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Required credentials and tools for a run
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteChecker {
    credentials: Vec<String>,
    tools: Vec<String>,
}

impl PrerequisiteChecker {
    pub fn new(credentials: Vec<String>, tools: Vec<String>) -> Self {
        Self { credentials, tools }
    }

    /// Settings requirements plus the program of every declared build step
    pub fn for_run(settings: &Settings, registry: &Registry) -> Self {
        let mut tools = settings.required_tools.clone();
        for program in registry.iter().filter_map(build_program) {
            if !tools.contains(&program) {
                tools.push(program);
            }
        }
        Self::new(settings.required_credentials.clone(), tools)
    }

    /// Check everything, returning the full list of missing items
    pub fn check(&self) -> Result<(), PrerequisiteError> {
        let mut missing = Vec::new();

        for name in &self.credentials {
            match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => {}
                _ => missing.push(Missing::Credential(name.clone())),
            }
        }

        for tool in &self.tools {
            if which::which(tool).is_err() {
                missing.push(Missing::Tool(tool.clone()));
            }
        }

        if missing.is_empty() {
            tracing::debug!(
                credentials = self.credentials.len(),
                tools = self.tools.len(),
                "Prerequisites satisfied"
            );
            Ok(())
        } else {
            Err(PrerequisiteError { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::{BuildStep, Region, ServiceSpec};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_missing_and_empty_credentials() {
        let checker = PrerequisiteChecker::new(
            vec!["ROLLOUT_TEST_TOKEN_A".to_string(), "ROLLOUT_TEST_TOKEN_B".to_string()],
            Vec::new(),
        );

        temp_env::with_vars(
            [
                ("ROLLOUT_TEST_TOKEN_A", None),
                ("ROLLOUT_TEST_TOKEN_B", Some("  ")),
            ],
            || {
                let err = checker.check().unwrap_err();
                assert_eq!(
                    err.missing,
                    vec![
                        Missing::Credential("ROLLOUT_TEST_TOKEN_A".to_string()),
                        Missing::Credential("ROLLOUT_TEST_TOKEN_B".to_string()),
                    ]
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_all_present() {
        let checker = PrerequisiteChecker::new(
            vec!["ROLLOUT_TEST_TOKEN_A".to_string()],
            vec!["sh".to_string()],
        );
        temp_env::with_var("ROLLOUT_TEST_TOKEN_A", Some("secret"), || {
            assert!(checker.check().is_ok());
        });
    }

    #[test]
    fn test_missing_tool() {
        let checker =
            PrerequisiteChecker::new(Vec::new(), vec!["rollout-no-such-tool-7f3a".to_string()]);
        let err = checker.check().unwrap_err();
        assert_eq!(
            err.missing,
            vec![Missing::Tool("rollout-no-such-tool-7f3a".to_string())]
        );
        assert!(err.to_string().contains("rollout-no-such-tool-7f3a"));
    }

    #[test]
    fn test_build_programs_are_required() {
        let mut web = ServiceSpec::new("web", "web", vec![Region::parse("ord").unwrap()]).unwrap();
        web.build = Some(BuildStep {
            command: "npm run build".to_string(),
            artifact: None,
        });
        let registry = Registry {
            name: "acme".to_string(),
            services: vec![web],
        };

        let checker = PrerequisiteChecker::for_run(&Settings::default(), &registry);
        assert_eq!(checker.tools, vec!["flyctl", "git", "npm"]);
        assert_eq!(
            checker.credentials,
            vec!["PLATFORM_API_TOKEN", "GITHUB_TOKEN"]
        );
    }
}
