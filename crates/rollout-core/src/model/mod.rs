//! Model definitions
//!
//! Each concern lives in its own module and is re-exported here.

mod attempt;
mod health;
mod service;

// Re-exports
pub use attempt::*;
pub use health::*;
pub use service::*;
