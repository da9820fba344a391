//! Utilities
//!
//! Error types and logging setup.

pub mod error;
pub mod logging;

pub use error::*;
pub use logging::init_logging;
