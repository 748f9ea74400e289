//! Deployment attempt records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a single deploy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed,
    TimedOut,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "success"),
            AttemptOutcome::Failed => write!(f, "failed"),
            AttemptOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// One iteration of the deploy retry loop. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentAttempt {
    /// 1-based attempt number
    pub attempt: u32,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub outcome: AttemptOutcome,

    /// Tail of the captured deploy output
    pub log_excerpt: String,
}

/// Final outcome of a service in a pipeline or recovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    Succeeded,
    ExhaustedFailed,
    ValidationFailed,
    BuildFailed,
    #[default]
    NotAttempted,
}

impl DeployOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeployOutcome::Succeeded)
    }
}

impl std::fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployOutcome::Succeeded => write!(f, "succeeded"),
            DeployOutcome::ExhaustedFailed => write!(f, "exhausted"),
            DeployOutcome::ValidationFailed => write!(f, "validation failed"),
            DeployOutcome::BuildFailed => write!(f, "build failed"),
            DeployOutcome::NotAttempted => write!(f, "not attempted"),
        }
    }
}

/// Keep the last `lines` lines of a captured output
pub fn tail_lines(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines() {
        let output = "one\ntwo\nthree\nfour";
        assert_eq!(tail_lines(output, 2), "three\nfour");
        assert_eq!(tail_lines(output, 10), output);
        assert_eq!(tail_lines("", 3), "");
    }

    #[test]
    fn test_outcome_serde() {
        let json = serde_json::to_string(&DeployOutcome::ExhaustedFailed).unwrap();
        assert_eq!(json, "\"exhausted_failed\"");
        let json = serde_json::to_string(&AttemptOutcome::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
    }
}
