//! Platform error types

use thiserror::Error;

/// Platform adapter errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Platform CLI not found: {0}")]
    ToolNotFound(String),

    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Application not found: {0}")]
    AppNotFound(String),

    #[error("Unexpected platform response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
