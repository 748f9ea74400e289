//! Fly adapter error types

use rollout_platform::PlatformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlyError {
    #[error("flyctl not found. Please install: curl -L https://fly.io/install.sh | sh")]
    FlyctlNotFound,

    #[error("flyctl command failed: {0}")]
    CommandFailed(String),

    #[error("App not found: {0}")]
    AppNotFound(String),

    #[error("No machine to clone for app {0}")]
    NoMachines(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlyError>;

impl From<FlyError> for PlatformError {
    fn from(err: FlyError) -> Self {
        match err {
            FlyError::FlyctlNotFound => PlatformError::ToolNotFound("flyctl".to_string()),
            FlyError::AppNotFound(app) => PlatformError::AppNotFound(app),
            FlyError::JsonError(e) => PlatformError::Json(e),
            FlyError::IoError(e) => PlatformError::Io(e),
            other => PlatformError::CommandFailed {
                command: "flyctl".to_string(),
                message: other.to_string(),
            },
        }
    }
}
