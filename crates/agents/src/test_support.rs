//! Shared fixtures for agent unit tests.

use std::sync::Arc;

use crate::agent::AgentContext;
use uber_codegen_core::GatewaySettings;
use uber_codegen_llm::{ModelGateway, ScriptedProvider};

pub const TEST_KEY: &str = "gsk_test_key_0123456789";

/// Context whose gateway answers from `provider`.
pub fn context(provider: ScriptedProvider) -> (AgentContext, Arc<ScriptedProvider>) {
    let provider = provider.into_arc();
    let gateway = ModelGateway::with_provider(
        GatewaySettings::default().with_api_key(TEST_KEY),
        provider.clone(),
    );
    (AgentContext::new(Arc::new(gateway)), provider)
}

/// Context with no credential: every call short-circuits to unavailable.
pub fn offline_context() -> AgentContext {
    let gateway = ModelGateway::with_provider(
        GatewaySettings::default(),
        ScriptedProvider::failing().into_arc(),
    );
    AgentContext::new(Arc::new(gateway))
}
