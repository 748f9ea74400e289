use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Invalid settings file {path}: {source}")]
    InvalidSettings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
