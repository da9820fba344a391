//! Streaming Integration Tests
//!
//! Ordering and framing of the protocol event stream.

use std::sync::Arc;

use serde_json::Value;

use uber_codegen::{
    to_sse, EventBody, GenerateRequest, MemorySink, ProtocolEvent, RegenerateRequest, RunPhase,
    StepStatus,
};
use uber_codegen_core::StageKind;
use uber_codegen_llm::{ScriptedProvider, ScriptedReply};

use super::support::*;

const PROMPT: &str = "write a function that adds two numbers";
const DOCUMENTED: &str = "def add(a, b):\n    \"\"\"Add two numbers.\"\"\"\n    return a + b\n";

async fn single_run_events(provider: ScriptedProvider) -> Vec<ProtocolEvent> {
    let (pipeline, _) = pipeline(provider);
    collect(pipeline.run_streaming(GenerateRequest::new(PROMPT)).unwrap()).await
}

fn custom_value<'a>(event: &'a ProtocolEvent, name: &str) -> Option<&'a Value> {
    match &event.body {
        EventBody::Custom { name: n, value } if n == name => Some(value),
        _ => None,
    }
}

fn generation_message_id(events: &[ProtocolEvent]) -> String {
    events
        .iter()
        .find_map(|e| match &e.body {
            EventBody::TextMessageStart { message_id, .. } => Some(message_id.clone()),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn test_run_is_framed_by_start_and_single_terminal_event() {
    let events = single_run_events(single_file_script(ADD_PROGRAM)).await;
    let kinds = kinds(&events);

    assert_eq!(kinds.first(), Some(&"RUN_STARTED"));
    assert_eq!(kinds.last(), Some(&"RUN_FINISHED"));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == "STATE_SNAPSHOT").count(), 1);
    assert_eq!(kinds[kinds.len() - 2], "STATE_SNAPSHOT");

    match &events.last().unwrap().body {
        EventBody::RunFinished { result, .. } => {
            assert_eq!(result["code"], ADD_PROGRAM);
            assert_eq!(result["phase"], "complete");
        }
        other => panic!("unexpected terminal event {:?}", other),
    }
}

#[tokio::test]
async fn test_steps_are_bracketed_and_activity_stays_inside() {
    let events = single_run_events(single_file_script(ADD_PROGRAM)).await;

    let mut open: Option<String> = None;
    let mut order = Vec::new();
    for event in &events {
        match &event.body {
            EventBody::StepStarted { step_name } => {
                assert!(open.is_none(), "{} started inside {:?}", step_name, open);
                open = Some(step_name.clone());
                order.push(step_name.clone());
            }
            EventBody::StepFinished { step_name } => {
                assert_eq!(open.as_deref(), Some(step_name.as_str()));
                open = None;
            }
            _ => {
                if let Some(activity) = custom_value(event, "agent_activity") {
                    assert_eq!(activity["agentId"].as_str(), open.as_deref());
                }
                if let Some(result) = custom_value(event, "agent_result") {
                    assert_eq!(result["agentId"].as_str(), open.as_deref());
                }
            }
        }
    }
    assert!(open.is_none());
    assert_eq!(
        order,
        vec!["classifier", "code_generator", "validator", "testing", "security"]
    );
}

#[tokio::test]
async fn test_text_deltas_rebuild_the_generated_code() {
    let provider = single_file_script(ADD_PROGRAM).with_chunk_size(7);
    let events = single_run_events(provider).await;
    let message_id = generation_message_id(&events);

    let deltas: Vec<&str> = events
        .iter()
        .filter_map(|e| match &e.body {
            EventBody::TextMessageContent { message_id: id, delta } if *id == message_id => {
                Some(delta.as_str())
            }
            _ => None,
        })
        .collect();
    assert!(deltas.len() > 1);
    assert_eq!(deltas.concat(), ADD_PROGRAM);

    let kinds = kinds(&events);
    let start = kinds.iter().position(|k| *k == "TEXT_MESSAGE_START").unwrap();
    let end = kinds.iter().position(|k| *k == "TEXT_MESSAGE_END").unwrap();
    let contents: Vec<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| **k == "TEXT_MESSAGE_CONTENT")
        .map(|(i, _)| i)
        .collect();
    assert!(contents.iter().all(|i| *i > start && *i < end));
}

#[tokio::test]
async fn test_fix_is_reported_as_tool_call_under_generation_message() {
    let provider = ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(ADD_PROGRAM),
        Some(StageKind::Validator) => fixing(StageKind::Validator, "Added docstring", DOCUMENTED),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    });
    let events = single_run_events(provider).await;
    let message_id = generation_message_id(&events);

    let start = events
        .iter()
        .position(|e| e.kind() == "TOOL_CALL_START")
        .unwrap();
    let EventBody::ToolCallStart {
        tool_call_id,
        tool_call_name,
        parent_message_id,
    } = &events[start].body
    else {
        unreachable!()
    };
    assert_eq!(tool_call_name, "validator_fix");
    assert_eq!(parent_message_id.as_deref(), Some(message_id.as_str()));

    assert_eq!(
        kinds(&events[start..start + 4]),
        vec!["TOOL_CALL_START", "TOOL_CALL_ARGS", "TOOL_CALL_END", "TOOL_CALL_RESULT"]
    );
    match &events[start + 1].body {
        EventBody::ToolCallArgs { tool_call_id: id, delta } => {
            assert_eq!(id, tool_call_id);
            assert!(delta.contains("Added docstring"));
        }
        other => panic!("unexpected {:?}", other),
    }
    match &events[start + 3].body {
        EventBody::ToolCallResult { tool_call_id: id, content, .. } => {
            assert_eq!(id, tool_call_id);
            assert_eq!(content, "Applied: Added docstring");
        }
        other => panic!("unexpected {:?}", other),
    }

    let update = events
        .iter()
        .find_map(|e| custom_value(e, "code_update"))
        .unwrap();
    assert_eq!(update["agentId"], "validator");
    assert_eq!(update["code"], DOCUMENTED);
}

fn patches<'a>(events: &'a [ProtocolEvent], path: &str) -> Vec<(usize, &'a Value)> {
    events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match &e.body {
            EventBody::StateDelta { delta } => Some((i, delta)),
            _ => None,
        })
        .flat_map(|(i, delta)| {
            delta
                .iter()
                .filter(|op| op.path == path)
                .map(move |op| (i, &op.value))
        })
        .collect()
}

#[tokio::test]
async fn test_phase_deltas_follow_each_stage() {
    let events = single_run_events(single_file_script(ADD_PROGRAM)).await;

    let phases: Vec<&str> = patches(&events, "/phase")
        .into_iter()
        .filter_map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(
        phases,
        vec!["classifying", "generating", "validating", "testing", "securing"]
    );
}

#[tokio::test]
async fn test_accepted_fix_updates_code_in_state_delta() {
    let provider = ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Generator) => ScriptedReply::text(ADD_PROGRAM),
        Some(StageKind::Validator) => fixing(StageKind::Validator, "Added docstring", DOCUMENTED),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    });
    let events = single_run_events(provider).await;

    let code = patches(&events, "/code");
    assert_eq!(code.len(), 2);
    assert_eq!(code[0].1, ADD_PROGRAM);
    assert_eq!(code[1].1, DOCUMENTED);

    let validator_start = events
        .iter()
        .position(|e| {
            matches!(&e.body, EventBody::StepStarted { step_name } if step_name == "validator")
        })
        .unwrap();
    let validator_end = events
        .iter()
        .position(|e| {
            matches!(&e.body, EventBody::StepFinished { step_name } if step_name == "validator")
        })
        .unwrap();
    assert!(code[1].0 > validator_start && code[1].0 < validator_end);
}

#[tokio::test]
async fn test_sse_frames_carry_type_and_camel_case_fields() {
    let events = single_run_events(single_file_script(ADD_PROGRAM)).await;

    for event in &events {
        let frame = to_sse(event).unwrap();
        let body = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        assert!(!body.contains('\n'));
        let parsed: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["type"], event.kind());
        assert!(parsed["timestamp"].is_i64());
    }

    let started = wire(&events[0]);
    assert!(started["threadId"].is_string());
    assert!(started["runId"].is_string());
    assert_eq!(started["input"]["prompt"], PROMPT);
}

#[tokio::test]
async fn test_offline_run_streams_fallback_fragments_and_warnings() {
    let (pipeline, provider) = offline_pipeline();
    let events = collect(pipeline.run_streaming(GenerateRequest::new(PROMPT)).unwrap()).await;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(kinds(&events).last(), Some(&"RUN_FINISHED"));

    let deltas: Vec<&str> = events
        .iter()
        .filter_map(|e| match &e.body {
            EventBody::TextMessageContent { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert!(deltas.len() > 1);
    assert!(deltas.iter().all(|d| d.chars().count() <= 20));
    assert!(deltas.concat().starts_with("def solution(param1, param2):"));

    let warnings: Vec<&Value> = events
        .iter()
        .filter_map(|e| custom_value(e, "stage_warning"))
        .collect();
    assert!(warnings.iter().any(|w| w["agentId"] == "code_generator"));
    assert!(warnings.iter().any(|w| w["agentId"] == "security"));
}

#[tokio::test]
async fn test_session_id_becomes_thread_id() {
    let (pipeline, _) = pipeline(single_file_script(ADD_PROGRAM));
    let request = GenerateRequest::new(PROMPT).with_session_id("sess-42");
    let events = collect(pipeline.run_streaming(request).unwrap()).await;

    for event in [events.first().unwrap(), events.last().unwrap()] {
        assert_eq!(wire(event)["threadId"], "sess-42");
    }
}

#[tokio::test]
async fn test_session_runs_are_recorded_in_the_sink() {
    let sink = Arc::new(MemorySink::new());
    let (pipeline, _) = pipeline(single_file_script(ADD_PROGRAM));
    let pipeline = pipeline.with_sink(sink.clone());

    pipeline
        .run(GenerateRequest::new(PROMPT).with_session_id("sess-7"))
        .await
        .unwrap();
    pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    let recorded = sink.thread("sess-7").await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].code_text(), Some(ADD_PROGRAM));
    assert_eq!(sink.runs().await.len(), 1);
}

#[tokio::test]
async fn test_regenerate_stream_skips_classifier_step() {
    let (pipeline, provider) = pipeline(single_file_script(ADD_PROGRAM));
    let request = RegenerateRequest {
        original_prompt: "add numbers".into(),
        edit_instructions: "rename to add".into(),
        current_code: "def plus(a, b):\n    return a + b\n".into(),
        ..Default::default()
    };
    let events = collect(pipeline.regenerate_streaming(request).unwrap()).await;

    let steps: Vec<&str> = events
        .iter()
        .filter(|e| e.kind() == "STEP_STARTED")
        .filter_map(|e| e.step_name())
        .collect();
    assert_eq!(steps, vec!["code_generator", "validator", "testing", "security"]);
    assert!(requests_for(&provider, StageKind::Classifier).is_empty());
    assert_eq!(kinds(&events).last(), Some(&"RUN_FINISHED"));
}

fn crashing_classifier() -> ScriptedProvider {
    ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Classifier) => panic!("classifier responder exploded"),
        Some(StageKind::Generator) => ScriptedReply::text(ADD_PROGRAM),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    })
}

#[tokio::test]
async fn test_crash_outside_a_stage_ends_with_run_error() {
    let (pipeline, provider) = pipeline(crashing_classifier());
    let events = collect(pipeline.run_streaming(GenerateRequest::new(PROMPT)).unwrap()).await;
    let kinds = kinds(&events);

    assert_eq!(kinds.first(), Some(&"RUN_STARTED"));
    assert_eq!(kinds.last(), Some(&"RUN_ERROR"));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(!kinds.contains(&"STATE_SNAPSHOT"));
    assert!(requests_for(&provider, StageKind::Generator).is_empty());

    match &events.last().unwrap().body {
        EventBody::RunError { message, code } => {
            assert_eq!(code.as_deref(), Some("pipeline_error"));
            assert!(message.contains("classifier responder exploded"));
        }
        other => panic!("unexpected terminal event {:?}", other),
    }
}

#[tokio::test]
async fn test_crashed_run_marks_the_active_step_failed() {
    let (pipeline, _) = pipeline(crashing_classifier());
    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    assert_eq!(run.phase, RunPhase::Error);
    assert!(run.error.as_deref().unwrap().starts_with("pipeline crashed:"));
    let classifier = run.workflow.iter().find(|s| s.id == "classifier").unwrap();
    assert_eq!(classifier.status, StepStatus::Error);
    assert!(run
        .workflow
        .iter()
        .filter(|s| s.id != "classifier")
        .all(|s| s.status == StepStatus::Pending));
}
