//! rollout platform abstraction
//!
//! The orchestrator never talks to a hosting provider directly. It goes
//! through the [`Platform`] trait, which covers the handful of operations a
//! rollout needs: deploy to the primary region, read the service state, add
//! a replica in another region, keep a minimum instance count, restart and
//! fetch recent logs.
//!
//! Concrete adapters live in their own crates (`rollout-platform-fly`).
//! With the `test-utils` feature this crate also ships [`testing::ScriptedPlatform`],
//! an in-memory platform driven by per-service scripts.

pub mod error;
pub mod platform;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{PlatformError, Result};
pub use platform::{
    DeployOutput, DeployRequest, DeployStrategy, Platform, ReplicaOutcome, StatusSnapshot,
};
