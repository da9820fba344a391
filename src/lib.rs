//! Uber Code Generator
//!
//! Streaming multi-agent code generation. A prompt is classified as a
//! single file or a multi-file project, generated by a model (streamed
//! fragment by fragment), then passed through validator, tester and security
//! agents that may each rewrite it. Every model call degrades to a
//! deterministic heuristic when the model is unavailable.
//!
//! - `models` - configuration, requests and the run record
//! - `services` - the orchestrator, the event protocol and result sinks
//! - `utils` - errors and logging

pub mod models;
pub mod services;
pub mod utils;

pub use models::request::{CodeEdit, EditRequest, GenerateRequest, RegenerateRequest};
pub use models::run::{PipelineRun, ProjectFile, RunPhase, RunStats, StepStatus, WorkflowStep};
pub use models::settings::{AppConfig, LogFormat};
pub use services::orchestrator::Pipeline;
pub use services::protocol::{to_sse, EventBody, EventEncoder, ProtocolEvent};
pub use services::sink::{MemorySink, NoopSink, ResultSink};
pub use utils::error::{AppError, AppResult};
