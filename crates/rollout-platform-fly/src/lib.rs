//! Fly.io platform adapter for rollout
//!
//! Implements [`rollout_platform::Platform`] on top of the `flyctl` CLI.
//!
//! # Requirements
//!
//! - `flyctl` must be installed and on PATH
//! - `PLATFORM_API_TOKEN` is forwarded to flyctl as `FLY_API_TOKEN`
//!
//! # Example
//!
//! ```ignore
//! use rollout_platform::Platform;
//! use rollout_platform_fly::FlyPlatform;
//!
//! let platform = FlyPlatform::from_env();
//! let snapshot = platform.status(&service).await?;
//! ```

pub mod error;
pub mod flyctl;
pub mod provider;

pub use error::{FlyError, Result};
pub use flyctl::{Flyctl, MachineInfo};
pub use provider::FlyPlatform;
