//! Pipeline Integration Tests
//!
//! Single-shot runs over a scripted model: stage order, fix chaining,
//! fallbacks without a credential, crash isolation and request validation.

use uber_codegen::{
    AppError, CodeEdit, EditRequest, GenerateRequest, RegenerateRequest, RunPhase, StepStatus,
};
use uber_codegen_agents::prompts::GENERATION_BUDGET;
use uber_codegen_core::{CodeArtifact, PipelineMode, StageKind};
use uber_codegen_llm::{ScriptedProvider, ScriptedReply};

use super::support::*;

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_single_file_run_completes_every_step() {
    let (pipeline, provider) = pipeline(single_file_script(ADD_PROGRAM));

    let run = pipeline
        .run(GenerateRequest::new("write a function that adds two numbers"))
        .await
        .unwrap();

    assert_eq!(run.mode, PipelineMode::Single);
    assert_eq!(run.phase, RunPhase::Complete);
    assert_eq!(run.code, CodeArtifact::Single(ADD_PROGRAM.to_string()));
    assert!(run.ai_powered);
    assert!(!run.code_was_fixed);
    assert!(run.original_code.is_none());
    assert_eq!(run.total_fixes, 0);
    assert!(run.warnings.is_empty(), "unexpected warnings: {:?}", run.warnings);

    let ids: Vec<_> = run.workflow.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["classifier", "code_generator", "validator", "testing", "security"]);
    assert!(run.workflow.iter().all(|s| s.status == StepStatus::Complete));
    assert!(run.workflow.iter().all(|s| s.duration.is_some()));

    let stages: Vec<_> = provider.requests().iter().filter_map(stage_of).collect();
    assert_eq!(
        stages,
        vec![
            StageKind::Classifier,
            StageKind::Generator,
            StageKind::Validator,
            StageKind::Tester,
            StageKind::Security,
        ]
    );

    let generation = &requests_for(&provider, StageKind::Generator)[0];
    assert!(generation.streamed);
    assert_eq!(generation.max_tokens, GENERATION_BUDGET);
    assert_eq!(generation.input, "write a function that adds two numbers");

    assert_eq!(run.validation.as_ref().unwrap().status, "passed");
    assert_eq!(run.tests.as_ref().unwrap().score, Some(90));
    assert!(run.security.as_ref().unwrap().ai_powered);
    assert_eq!(run.stats.total_lines, 2);
}

#[tokio::test]
async fn test_fenced_generation_is_unwrapped() {
    let (pipeline, _) = pipeline(single_file_script("```python\nprint('hi')\n```"));
    let run = pipeline.run(GenerateRequest::new("print hi")).await.unwrap();
    assert_eq!(run.code_text(), Some("print('hi')"));
}

// ============================================================================
// Fix chaining
// ============================================================================

const V1: &str = "def div(a, b):\n    return a / b\n";
const V2: &str = "def div(a: float, b: float) -> float:\n    return a / b\n";
const V3: &str = "def div(a: float, b: float) -> float:\n    if b == 0:\n        raise ValueError(\"b\")\n    return a / b\n";
const V4: &str = "def div(a: float, b: float) -> float:\n    if not b:\n        raise ValueError(\"b\")\n    return a / b\n";

#[tokio::test]
async fn test_fixes_chain_in_stage_order() {
    let (pipeline, provider) = pipeline(ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(V1),
        Some(StageKind::Validator) => fixing(StageKind::Validator, "Added type hints", V2),
        Some(StageKind::Tester) => fixing(StageKind::Tester, "Guard against zero", V3),
        Some(StageKind::Security) => fixing(StageKind::Security, "Simplified guard", V4),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    }));

    let run = pipeline.run(GenerateRequest::new("divide two numbers")).await.unwrap();

    assert_eq!(run.code_text(), Some(V4));
    assert_eq!(run.original_code, Some(CodeArtifact::Single(V1.to_string())));
    assert!(run.code_was_fixed);
    assert_eq!(run.total_fixes, 3);
    let agents: Vec<_> = run.all_fixes.iter().map(|f| f.agent.as_str()).collect();
    assert_eq!(agents, vec!["validator", "testing", "security"]);
    assert_eq!(run.all_fixes[0].description, "Added type hints");

    // Each stage sees the previous stage's output
    assert!(requests_for(&provider, StageKind::Validator)[0].input.contains(V1));
    assert!(requests_for(&provider, StageKind::Tester)[0].input.contains(V2));
    assert!(requests_for(&provider, StageKind::Security)[0].input.contains(V3));
}

#[tokio::test]
async fn test_unbalanced_replacement_is_discarded() {
    let broken = "def div(a, b:\n    return a / b\n";
    let (pipeline, _) = pipeline(ScriptedProvider::new(move |request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(V1),
        Some(StageKind::Validator) => fixing(StageKind::Validator, "Broke it", broken),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    }));

    let run = pipeline.run(GenerateRequest::new("divide")).await.unwrap();

    assert_eq!(run.code_text(), Some(V1));
    assert_eq!(run.total_fixes, 0);
    let validation = run.validation.as_ref().unwrap();
    assert!(validation.fixed_code.is_none());
    assert!(validation.fixes.is_empty());
    assert!(validation.warnings.iter().any(|w| w.contains("unbalanced")));
    assert!(run.warnings.iter().any(|w| w.starts_with("validator:")));
}

#[tokio::test]
async fn test_fixes_without_code_are_not_applied() {
    let (pipeline, _) = pipeline(ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(V1),
        Some(StageKind::Validator) => json_reply(serde_json::json!({
            "status": "fixed",
            "fixes_applied": ["Renamed variables"],
            "fixed_code": "THE COMPLETE FIXED CODE HERE",
        })),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    }));

    let run = pipeline.run(GenerateRequest::new("divide")).await.unwrap();
    assert_eq!(run.code_text(), Some(V1));
    assert_eq!(run.total_fixes, 0);
    assert!(!run.code_was_fixed);
}

// ============================================================================
// Degraded operation
// ============================================================================

#[tokio::test]
async fn test_invalid_key_runs_entirely_on_heuristics() {
    let (pipeline, provider) = offline_pipeline();

    let run = pipeline
        .run(GenerateRequest::new("compute with eval( on input").with_api_key("short"))
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 0);
    assert_eq!(run.phase, RunPhase::Complete);
    assert_eq!(run.mode, PipelineMode::Single);
    assert!(!run.ai_powered);
    assert!(run.code_text().unwrap().starts_with("def solution(param1, param2):"));
    assert!(run.workflow.iter().all(|s| s.status == StepStatus::Complete));

    for stage in [StageKind::Validator, StageKind::Tester, StageKind::Security] {
        let result = run.stage(stage).unwrap();
        assert!(!result.ai_powered, "{} should be heuristic", stage);
        assert!(result.degraded);
        assert!(result.fixed_code.is_none());
    }

    // The prompt is echoed into the canned program's docstring
    let security = run.security.as_ref().unwrap();
    assert_eq!(security.findings.len(), 1);
    assert_eq!(security.score, Some(25));
    assert_eq!(run.tests.as_ref().unwrap().score, Some(50));
    assert!(!run.warnings.is_empty());
}

#[tokio::test]
async fn test_outage_falls_back_per_stage() {
    let (pipeline, _) = pipeline(ScriptedProvider::failing());
    let run = pipeline.run(GenerateRequest::new("add numbers")).await.unwrap();

    assert_eq!(run.phase, RunPhase::Complete);
    assert!(!run.ai_powered);
    assert!(run.code_text().unwrap().contains("Generated function for: add numbers..."));
    assert!(run.validation.as_ref().unwrap().degraded);
}

#[tokio::test]
async fn test_partial_stream_keeps_text() {
    let (pipeline, _) = pipeline(ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::Partial {
            text: "def half(x):\n    return x / 2\n".into(),
            error: "connection reset".into(),
        },
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    }));

    let run = pipeline.run(GenerateRequest::new("halve")).await.unwrap();
    assert_eq!(run.code_text(), Some("def half(x):\n    return x / 2\n"));
    assert!(run.ai_powered);
    assert!(run.warnings.iter().any(|w| w.contains("stopped early")));
}

#[tokio::test]
async fn test_crashing_stage_does_not_abort_run() {
    let (pipeline, provider) = pipeline(ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(ADD_PROGRAM),
        Some(StageKind::Tester) => panic!("tester exploded"),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    }));

    let run = pipeline.run(GenerateRequest::new("add")).await.unwrap();

    assert_eq!(run.phase, RunPhase::Complete);
    let tests = run.tests.as_ref().unwrap();
    assert_eq!(tests.status, "degraded");
    assert!(tests.warnings[0].contains("tester exploded"));
    assert!(run.step("testing").unwrap().status == StepStatus::Complete);
    // Security still ran after the crash
    assert_eq!(requests_for(&provider, StageKind::Security).len(), 1);
    assert_eq!(run.security.as_ref().unwrap().status, "secure");
}

// ============================================================================
// Other entry points
// ============================================================================

#[tokio::test]
async fn test_follow_up_wraps_context_code() {
    let (pipeline, provider) = pipeline(single_file_script(ADD_PROGRAM));
    pipeline
        .run(GenerateRequest::new("also subtract").with_context_code("def add(a, b): ..."))
        .await
        .unwrap();

    let classifier = &requests_for(&provider, StageKind::Classifier)[0];
    assert_eq!(classifier.input, "also subtract");
    let generation = &requests_for(&provider, StageKind::Generator)[0];
    assert!(generation.input.contains("def add(a, b): ..."));
    assert!(generation.input.contains("User's follow-up request: also subtract"));
}

#[tokio::test]
async fn test_regenerate_skips_classification() {
    let (pipeline, provider) = pipeline(single_file_script(ADD_PROGRAM));
    let run = pipeline
        .regenerate(RegenerateRequest {
            original_prompt: "add numbers".into(),
            edit_instructions: "use type hints".into(),
            current_code: "def add(a, b): return a + b".into(),
            api_key: None,
        })
        .await
        .unwrap();

    assert!(requests_for(&provider, StageKind::Classifier).is_empty());
    assert!(run.step("classifier").is_none());
    assert_eq!(run.workflow.len(), 4);
    let generation = &requests_for(&provider, StageKind::Generator)[0];
    assert!(generation.input.starts_with("Original request: add numbers"));
    assert!(generation.input.contains("use type hints"));
}

#[tokio::test]
async fn test_run_agents_on_edited_code() {
    let (pipeline, provider) = pipeline(single_file_script(ADD_PROGRAM));
    let request = EditRequest {
        original_code: "def add(a, b):\n    return a - b\n".into(),
        updates: vec![CodeEdit {
            old: "a - b".into(),
            new: "a + b".into(),
        }],
        api_key: None,
    };

    let run = pipeline.run_agents_on_code(request).await.unwrap();

    assert_eq!(run.code_text(), Some(ADD_PROGRAM));
    assert!(requests_for(&provider, StageKind::Generator).is_empty());
    let ids: Vec<_> = run.workflow.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["validator", "testing", "security"]);
    assert!(requests_for(&provider, StageKind::Validator)[0]
        .input
        .contains("return a + b"));
}

#[tokio::test]
async fn test_clean_analysis_is_idempotent() {
    let (pipeline, _) = pipeline(single_file_script(ADD_PROGRAM));
    let first = pipeline
        .run_agents_on_code(EditRequest {
            original_code: ADD_PROGRAM.into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let second = pipeline
        .run_agents_on_code(EditRequest {
            original_code: first.code_text().unwrap().to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(first.code, second.code);
    assert_eq!(second.code_text(), Some(ADD_PROGRAM));
    assert_eq!(second.total_fixes, 0);
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test]
async fn test_invalid_requests_rejected_before_any_stage() {
    let (pipeline, provider) = pipeline(single_file_script(ADD_PROGRAM));

    let err = pipeline.run(GenerateRequest::new("  ")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(pipeline.run_streaming(GenerateRequest::new("")).is_err());

    let err = pipeline
        .regenerate(RegenerateRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_client_error());

    let err = pipeline
        .run_agents_on_code(EditRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_client_error());

    assert_eq!(provider.call_count(), 0);
}
