use std::path::PathBuf;
use thiserror::Error;

/// A single static check that failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Service directory not found: {0}")]
    ServiceDirNotFound(PathBuf),

    #[error("Deployment descriptor not found: {0}")]
    DescriptorNotFound(PathBuf),

    #[error("Deployment descriptor {path} is malformed: {message}")]
    DescriptorMalformed { path: PathBuf, message: String },

    #[error("Descriptor primary_region '{found}' does not match the first declared region '{expected}'")]
    RegionMismatch { expected: String, found: String },

    #[error("Build manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Build manifest {path} is malformed: {message}")]
    ManifestMalformed { path: PathBuf, message: String },

    #[error("Critical dependency '{name}' is not declared in {manifest}")]
    DependencyMissing { name: String, manifest: PathBuf },

    #[error("Critical dependency '{name}' requires >= {required}, found '{found}'")]
    DependencyTooOld {
        name: String,
        required: String,
        found: String,
    },

    #[error("Lockfile not found: {0}")]
    LockfileNotFound(PathBuf),

    #[error("Lockfile {lockfile} does not resolve critical dependency '{name}'")]
    LockfileMissingDependency { name: String, lockfile: PathBuf },

    #[error("Lockfile resolves '{name}' to {resolved}, below required {required}")]
    LockfileOutdated {
        name: String,
        required: String,
        resolved: String,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid build command: {0}")]
    InvalidCommand(String),

    #[error("Build command `{command}` failed (exit code {exit_code:?})")]
    BuildFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Build artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Message for the operator, including captured output when there is some
    pub fn user_message(&self) -> String {
        match self {
            BuildError::BuildFailed { output, .. } if !output.is_empty() => {
                format!("{}\n\n{}", self, output)
            }
            BuildError::ArtifactNotFound(path) => {
                format!(
                    "Build artifact not found: {}\n\
                     \n\
                     Check the `artifact=` property of the build step in rollout.kdl.",
                    path.display()
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
