//! rollout pre-deploy steps
//!
//! - [`validator`]: static checks on a service directory (deployment
//!   descriptor, build manifest, lockfile)
//! - [`builder`]: runs the declared build command and checks its artifact

pub mod builder;
pub mod error;
pub mod validator;

pub use builder::{BuildOutcome, build_program, build_service};
pub use error::{BuildError, Result, ValidationError};
pub use validator::validate_service;
