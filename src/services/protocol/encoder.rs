//! Event Encoder
//!
//! Builds protocol events for one run and renders them as SSE frames
//! (`data: {json}\n\n`).

use serde::Serialize;
use serde_json::{json, Value};

use super::events::{custom, EventBody, PatchOp, ProtocolEvent};
use crate::utils::error::AppResult;

/// Short random id with a readable prefix, e.g. `msg_1a2b3c4d`.
pub fn new_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

/// Render one event as an SSE frame.
pub fn to_sse(event: &ProtocolEvent) -> AppResult<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

/// Event factory bound to one thread/run pair.
#[derive(Debug, Clone)]
pub struct EventEncoder {
    thread_id: String,
    run_id: String,
}

impl EventEncoder {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }

    /// Fresh thread and run ids.
    pub fn generate() -> Self {
        Self::new(new_id("thread"), new_id("run"))
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_started(&self, input: Value) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::RunStarted {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
            input,
        })
    }

    pub fn run_finished(&self, result: Value) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::RunFinished {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
            result,
        })
    }

    pub fn run_error(&self, message: impl Into<String>, code: Option<&str>) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::RunError {
            message: message.into(),
            code: code.map(str::to_string),
        })
    }

    pub fn step_started(&self, step_name: &str) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::StepStarted {
            step_name: step_name.to_string(),
        })
    }

    pub fn step_finished(&self, step_name: &str) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::StepFinished {
            step_name: step_name.to_string(),
        })
    }

    pub fn text_start(&self, message_id: &str) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::TextMessageStart {
            message_id: message_id.to_string(),
            role: "assistant".to_string(),
        })
    }

    pub fn text_content(&self, message_id: &str, delta: impl Into<String>) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::TextMessageContent {
            message_id: message_id.to_string(),
            delta: delta.into(),
        })
    }

    pub fn text_end(&self, message_id: &str) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::TextMessageEnd {
            message_id: message_id.to_string(),
        })
    }

    /// START, ARGS, END, RESULT for one applied fix.
    pub fn tool_call<A: Serialize>(
        &self,
        tool_name: &str,
        args: &A,
        result: &str,
        parent_message_id: Option<&str>,
    ) -> AppResult<Vec<ProtocolEvent>> {
        let tool_call_id = new_id("tool");
        Ok(vec![
            ProtocolEvent::new(EventBody::ToolCallStart {
                tool_call_id: tool_call_id.clone(),
                tool_call_name: tool_name.to_string(),
                parent_message_id: parent_message_id.map(str::to_string),
            }),
            ProtocolEvent::new(EventBody::ToolCallArgs {
                tool_call_id: tool_call_id.clone(),
                delta: serde_json::to_string(args)?,
            }),
            ProtocolEvent::new(EventBody::ToolCallEnd {
                tool_call_id: tool_call_id.clone(),
            }),
            ProtocolEvent::new(EventBody::ToolCallResult {
                message_id: new_id("result"),
                tool_call_id,
                content: result.to_string(),
                role: "tool".to_string(),
            }),
        ])
    }

    pub fn state_snapshot(&self, snapshot: Value) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::StateSnapshot { snapshot })
    }

    pub fn state_delta(&self, delta: Vec<PatchOp>) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::StateDelta { delta })
    }

    pub fn custom(&self, name: &str, value: Value) -> ProtocolEvent {
        ProtocolEvent::new(EventBody::Custom {
            name: name.to_string(),
            value,
        })
    }

    pub fn stage_warning(&self, stage: &str, message: &str) -> ProtocolEvent {
        self.custom(
            custom::STAGE_WARNING,
            json!({ "agentId": stage, "message": message }),
        )
    }
}
