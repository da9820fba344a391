//! Agent Plumbing
//!
//! [`AgentContext`] binds the shared gateway to one request's credential
//! override. [`AnalysisAgent`] is the seam the orchestrator drives for the
//! three artifact-rewriting stages (validator, tester, security).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use uber_codegen_core::{StageKind, StageResult};
use uber_codegen_interpreter::JsonMap;
use uber_codegen_llm::{GatewayStream, ModelGateway};

/// Gateway plus the per-request credential override.
#[derive(Debug, Clone)]
pub struct AgentContext {
    gateway: Arc<ModelGateway>,
    api_key: Option<String>,
}

impl AgentContext {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            api_key: None,
        }
    }

    /// Per-request credential. The gateway ignores it unless it is longer than 10 chars.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// True when model calls will be attempted.
    pub fn is_ai_available(&self) -> bool {
        self.gateway.is_available(self.api_key.as_deref())
    }

    pub async fn call(&self, instructions: &str, input: &str, max_tokens: u32) -> Option<String> {
        self.gateway
            .call(instructions, input, max_tokens, self.api_key.as_deref())
            .await
    }

    pub fn call_stream(&self, instructions: &str, input: &str, max_tokens: u32) -> GatewayStream {
        self.gateway
            .call_stream(instructions, input, max_tokens, self.api_key.as_deref())
    }
}

/// A stage that reviews the artifact and may return a complete replacement.
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    fn stage(&self) -> StageKind;

    fn context(&self) -> &AgentContext;

    /// System instructions sent with every call.
    fn instructions(&self) -> &'static str;

    fn token_budget(&self) -> u32;

    /// User message embedding the artifact. Marker lines pass through verbatim.
    fn build_input(&self, code: &str) -> String;

    /// Turn a recovered JSON mapping into a result.
    fn parse_response(&self, parsed: JsonMap) -> StageResult;

    /// Deterministic analysis used when the model is unavailable.
    fn run_heuristic(&self, code: &str) -> StageResult;

    /// Model analysis with heuristic fallback. Never fails.
    async fn analyze(&self, code: &str) -> StageResult {
        let stage = self.stage();
        let input = self.build_input(code);
        let raw = self
            .context()
            .call(self.instructions(), &input, self.token_budget())
            .await;

        match uber_codegen_interpreter::parse(raw.as_deref()) {
            Some(parsed) => {
                let mut result = self.parse_response(parsed);
                result.stage = stage;
                result.ai_powered = true;
                info!(
                    "[{}] model analysis complete: {} fixes",
                    stage.display_name(),
                    result.fixes.len()
                );
                result
            }
            None => {
                if raw.is_some() {
                    warn!(
                        "[{}] model output unparseable, using heuristic",
                        stage.display_name()
                    );
                } else {
                    warn!(
                        "[{}] model unavailable, using heuristic",
                        stage.display_name()
                    );
                }
                let mut result = self.run_heuristic(code);
                result.stage = stage;
                result.ai_powered = false;
                result.degraded = true;
                result
            }
        }
    }
}
