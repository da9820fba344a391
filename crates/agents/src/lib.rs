//! Uber Code Generator Agents
//!
//! One agent per pipeline stage, each wrapping a fixed prompt, the model
//! gateway and the response interpreter, with a deterministic fallback for
//! when the model is unavailable:
//!
//! - `classifier` - single vs multi-file scope (keyword scan can only escalate)
//! - `planner` - ordered file plan for multi-file projects
//! - `generator` - streamed code generation with canned fallbacks
//! - `validator`, `tester`, `security` - artifact-rewriting analysis stages
//!   behind the [`AnalysisAgent`] trait
//! - `prompts` - the prompt template store and token budgets
//! - `normalize` - coercion of loosely shaped model output into canonical types
//! - `catalog` - agent descriptions and the stage DAG

pub mod agent;
pub mod catalog;
pub mod classifier;
pub mod generator;
pub mod normalize;
pub mod planner;
pub mod prompts;
pub mod security;
pub mod tester;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use agent::{AgentContext, AnalysisAgent};
pub use catalog::{agent_catalog, pipeline_stages, workflow_graph, AgentInfo, WorkflowGraph};
pub use classifier::{heuristic_classify, Classification, ClassifierAgent};
pub use generator::{GenerationOutcome, GenerationStream, GeneratorAgent};
pub use planner::{PlanOutcome, PlannerAgent};
pub use security::SecurityAgent;
pub use tester::TesterAgent;
pub use validator::ValidatorAgent;
