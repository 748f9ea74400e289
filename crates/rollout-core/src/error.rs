use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid region code '{0}': expected lowercase letters and digits")]
    InvalidRegion(String),

    #[error("Invalid version for '{name}': {source}")]
    InvalidVersion {
        name: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid service definition: {0}")]
    InvalidService(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
