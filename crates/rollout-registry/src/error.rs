//! Registry error types

/// Errors raised while locating or parsing the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("rollout.kdl not found (set ROLLOUT_REGISTRY_PATH or run inside a project)")]
    NotFound,

    #[error("registry {path} (from {source_name}) does not exist")]
    Missing { path: std::path::PathBuf, source_name: String },

    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("Invalid registry definition: {0}")]
    InvalidConfig(String),

    #[error("Service '{0}' is declared more than once")]
    DuplicateService(String),

    #[error("Service '{service}' depends on '{dependency}', which is not declared before it")]
    UnknownDependency { service: String, dependency: String },

    #[error("Service '{service}': {source}")]
    InvalidService {
        service: String,
        #[source]
        source: rollout_core::CoreError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
