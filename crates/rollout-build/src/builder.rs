//! Build step runner

use crate::error::{BuildError, Result};
use rollout_core::ServiceSpec;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Result of the build stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The service declares no build step and deploys from its descriptor alone
    Skipped,
    /// The build command ran; captured stdout/stderr is kept for the run log
    Built { output: String },
}

/// Program a service's build command invokes, if it has one
pub fn build_program(service: &ServiceSpec) -> Option<String> {
    let build = service.build.as_ref()?;
    shell_words::split(&build.command)
        .ok()
        .and_then(|argv| argv.into_iter().next())
}

/// Run the build step of `service` inside `workdir`
pub async fn build_service(service: &ServiceSpec, workdir: &Path) -> Result<BuildOutcome> {
    let Some(build) = &service.build else {
        return Ok(BuildOutcome::Skipped);
    };

    let argv = shell_words::split(&build.command)
        .map_err(|e| BuildError::InvalidCommand(format!("{}: {}", build.command, e)))?;
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| BuildError::InvalidCommand("empty build command".to_string()))?;

    tracing::info!(service = %service.name, command = %build.command, "Building");

    let output = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    let mut captured = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !captured.is_empty() && !captured.ends_with('\n') {
            captured.push('\n');
        }
        captured.push_str(&stderr);
    }

    if !output.status.success() {
        return Err(BuildError::BuildFailed {
            command: build.command.clone(),
            exit_code: output.status.code(),
            output: captured,
        });
    }

    if let Some(artifact) = &build.artifact {
        let path = workdir.join(artifact);
        if !path.exists() {
            return Err(BuildError::ArtifactNotFound(path));
        }
    }

    Ok(BuildOutcome::Built { output: captured })
}
