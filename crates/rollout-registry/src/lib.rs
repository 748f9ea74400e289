//! rollout service registry
//!
//! The registry is the single source of truth for which services exist,
//! where their sources live, which regions they run in, and the order in
//! which they are deployed. Deploy, recovery and health monitoring all read
//! the same `rollout.kdl`.
//!
//! Order is declared, not inferred: foundation services come first and every
//! later service may assume the earlier ones already exist.

pub mod discovery;
pub mod error;
pub mod model;
pub mod parser;

pub use discovery::*;
pub use error::*;
pub use model::*;
pub use parser::*;
