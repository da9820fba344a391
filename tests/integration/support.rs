//! Shared fixtures: pipelines over a scripted model and canned stage replies.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio_stream::StreamExt;

use uber_codegen::{Pipeline, ProtocolEvent};
use uber_codegen_agents::prompts::{
    CLASSIFIER_PROMPT, FILE_GENERATION_SYSTEM, PLANNER_PROMPT, SECURITY_PROMPT,
    SINGLE_FILE_PROMPT, TESTER_PROMPT, VALIDATOR_PROMPT,
};
use uber_codegen_core::{GatewaySettings, StageKind};
use uber_codegen_llm::{ModelGateway, RecordedRequest, ScriptedProvider, ScriptedReply};
use tokio_stream::wrappers::ReceiverStream;

pub const TEST_KEY: &str = "gsk_integration_key_0001";

pub const ADD_PROGRAM: &str = "def add(a, b):\n    return a + b\n";

/// Which stage sent `request`.
pub fn stage_of(request: &RecordedRequest) -> Option<StageKind> {
    match request.instructions.as_str() {
        CLASSIFIER_PROMPT => Some(StageKind::Classifier),
        PLANNER_PROMPT => Some(StageKind::Planner),
        SINGLE_FILE_PROMPT | FILE_GENERATION_SYSTEM => Some(StageKind::Generator),
        VALIDATOR_PROMPT => Some(StageKind::Validator),
        TESTER_PROMPT => Some(StageKind::Tester),
        SECURITY_PROMPT => Some(StageKind::Security),
        _ => None,
    }
}

/// Requests sent by `stage`, in order.
pub fn requests_for(provider: &ScriptedProvider, stage: StageKind) -> Vec<RecordedRequest> {
    provider
        .requests()
        .into_iter()
        .filter(|r| stage_of(r) == Some(stage))
        .collect()
}

/// Pipeline whose gateway holds a valid key and answers from `provider`.
pub fn pipeline(provider: ScriptedProvider) -> (Pipeline, Arc<ScriptedProvider>) {
    let provider = provider.into_arc();
    let gateway = ModelGateway::with_provider(
        GatewaySettings::default().with_api_key(TEST_KEY),
        provider.clone(),
    );
    (Pipeline::new(Arc::new(gateway)), provider)
}

/// Pipeline with no credential configured.
pub fn offline_pipeline() -> (Pipeline, Arc<ScriptedProvider>) {
    let provider = ScriptedProvider::always("unreachable").into_arc();
    let gateway = ModelGateway::with_provider(GatewaySettings::default(), provider.clone());
    (Pipeline::new(Arc::new(gateway)), provider)
}

pub fn json_reply(value: Value) -> ScriptedReply {
    ScriptedReply::Text(value.to_string())
}

/// Clean verdict with no fixes.
pub fn passing(stage: StageKind) -> ScriptedReply {
    json_reply(match stage {
        StageKind::Classifier => json!({ "mode": "single" }),
        StageKind::Validator => json!({
            "status": "passed",
            "issues": [],
            "fixes_applied": [],
            "fixed_code": null,
        }),
        StageKind::Tester => json!({
            "status": "all_passed",
            "testability_score": 90,
            "issues_found": [],
            "fixes_applied": [],
        }),
        StageKind::Security => json!({
            "status": "secure",
            "risk_level": "low",
            "risk_score": 0,
            "vulnerabilities": [],
            "fixes_applied": [],
        }),
        _ => json!({}),
    })
}

/// Verdict that replaces the artifact with `fixed_code`.
pub fn fixing(stage: StageKind, description: &str, fixed_code: &str) -> ScriptedReply {
    json_reply(match stage {
        StageKind::Security => json!({
            "status": "fixed",
            "risk_level": "medium",
            "vulnerabilities": [{"type": "Injection", "severity": "medium", "description": description}],
            "fixes_applied": [{"description": description, "severity": "medium"}],
            "fixed_code": fixed_code,
        }),
        StageKind::Tester => json!({
            "status": "fixed",
            "testability_score": 75,
            "issues_found": ["Missing error handling"],
            "fixes_applied": [{"description": description}],
            "fixed_code": fixed_code,
        }),
        _ => json!({
            "status": "fixed",
            "issues": ["style"],
            "fixes_applied": [{"description": description}],
            "fixed_code": fixed_code,
        }),
    })
}

/// Single-file script: `code` from the generator, clean verdicts elsewhere.
pub fn single_file_script(code: &'static str) -> ScriptedProvider {
    ScriptedProvider::new(move |request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(code),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected instructions".into()),
    })
}

pub async fn collect(mut stream: ReceiverStream<ProtocolEvent>) -> Vec<ProtocolEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

pub fn kinds(events: &[ProtocolEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind()).collect()
}

pub fn wire(event: &ProtocolEvent) -> Value {
    serde_json::to_value(event).unwrap()
}
