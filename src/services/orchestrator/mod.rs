//! Pipeline Orchestration
//!
//! - `pipeline` - entry points and run lifecycle
//! - `single`, `multi` - classification and the two generation paths
//! - `analysis` - validator, tester and security with replacement guards
//! - `guards` - delimiter balance checks
//! - `workflow` - step status and timing
//! - `state` - per-run state and shared event helpers

mod analysis;
pub mod guards;
mod multi;
mod pipeline;
mod single;
mod state;
pub mod workflow;

pub use analysis::{analysis_agents, analysis_input, replacement_violation};
pub use pipeline::Pipeline;
pub use workflow::WorkflowTracker;
