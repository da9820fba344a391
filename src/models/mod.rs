//! Data Models
//!
//! Configuration, caller requests and the run record.

pub mod request;
pub mod run;
pub mod settings;

pub use request::*;
pub use run::*;
pub use settings::*;
