//! flyctl CLI wrapper
//!
//! Wraps the flyctl commands rollout needs for Fly.io operations.

use crate::error::{FlyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Credential variable forwarded to flyctl
pub const TOKEN_ENV: &str = "PLATFORM_API_TOKEN";

/// flyctl CLI wrapper
#[derive(Debug, Clone)]
pub struct Flyctl {
    program: String,
    token: Option<String>,
}

impl Flyctl {
    pub fn new(token: Option<String>) -> Self {
        Self {
            program: "flyctl".to_string(),
            token,
        }
    }

    /// Use a different flyctl binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Check that flyctl resolves on PATH
    pub fn check_installed(&self) -> Result<()> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| FlyError::FlyctlNotFound)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        if let Some(token) = &self.token {
            cmd.env("FLY_API_TOKEN", token);
        }
        cmd
    }

    /// Run a flyctl command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        tracing::debug!("Running: {} {}", self.program, args.join(" "));

        let output = self.command(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Could not find App") || stderr.contains("app not found") {
                let app = app_arg(args).unwrap_or_default();
                return Err(FlyError::AppNotFound(app.to_string()));
            }
            return Err(FlyError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Deploy from `workdir`; the raw process output is returned even on failure
    pub async fn deploy(
        &self,
        workdir: &Path,
        app: &str,
        config: &Path,
        strategy: &str,
        region: &str,
    ) -> Result<Output> {
        let config = config.to_string_lossy();
        let args = [
            "deploy",
            "--app",
            app,
            "--config",
            config.as_ref(),
            "--strategy",
            strategy,
            "--region",
            region,
            "--remote-only",
            "--yes",
        ];
        tracing::debug!(
            workdir = %workdir.display(),
            "Running: {} {}",
            self.program,
            args.join(" ")
        );

        let mut cmd = self.command(&args);
        cmd.current_dir(workdir);
        Ok(cmd.output().await?)
    }

    /// List machines of an app
    pub async fn list_machines(&self, app: &str) -> Result<Vec<MachineInfo>> {
        let output = self
            .run_command(&["machines", "list", "--app", app, "--json"])
            .await?;
        parse_machines(&output)
    }

    /// Clone a machine into another region
    pub async fn clone_machine(&self, app: &str, machine_id: &str, region: &str) -> Result<()> {
        self.run_command(&["machine", "clone", machine_id, "--region", region, "--app", app])
            .await?;
        Ok(())
    }

    /// Set the machine count
    pub async fn scale_count(&self, app: &str, count: u32) -> Result<()> {
        let count = count.to_string();
        self.run_command(&["scale", "count", count.as_str(), "--app", app, "--yes"])
            .await?;
        Ok(())
    }

    /// Restart every machine of an app
    pub async fn restart_app(&self, app: &str) -> Result<()> {
        self.run_command(&["apps", "restart", app]).await?;
        Ok(())
    }

    /// Buffered logs, without following
    pub async fn logs(&self, app: &str) -> Result<String> {
        self.run_command(&["logs", "--app", app, "--no-tail"]).await
    }
}

fn app_arg<'a>(args: &[&'a str]) -> Option<&'a str> {
    args.iter()
        .position(|a| *a == "--app")
        .and_then(|i| args.get(i + 1).copied())
        .or_else(|| match args {
            ["apps", "restart", app, ..] => Some(*app),
            _ => None,
        })
}

/// Parse `flyctl machines list --json` output
pub fn parse_machines(output: &str) -> Result<Vec<MachineInfo>> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "[]" {
        return Ok(Vec::new());
    }
    let machines: Vec<MachineInfo> = serde_json::from_str(trimmed)?;
    Ok(machines)
}

/// Machine entry as reported by flyctl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub state: String,
}

impl MachineInfo {
    pub fn is_started(&self) -> bool {
        self.state == "started"
    }

    pub fn is_failed(&self) -> bool {
        self.state == "failed"
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state.as_str(), "stopped" | "suspended")
    }
}
