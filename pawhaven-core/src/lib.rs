//! Pawhaven Core - Shared data structures for the Pawhaven client session layer
//!
//! This crate defines the user record and wire envelopes exchanged with the
//! backend, the unified error type, configuration loading and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
