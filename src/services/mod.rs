//! Services
//!
//! - `orchestrator` - the multi-agent pipeline
//! - `protocol` - AG-UI events, SSE encoding and the event emitter
//! - `sink` - where finished runs are recorded

pub mod orchestrator;
pub mod protocol;
pub mod sink;

pub use orchestrator::Pipeline;
pub use sink::{MemorySink, NoopSink, ResultSink};
