//! rollout core
//!
//! Domain model shared by every rollout crate: the services that make up a
//! deployment, the regions they run in, and the records produced while
//! deploying and checking them.

pub mod error;
pub mod model;

pub use error::{CoreError, Result};
pub use model::*;
