//! Protocol Event Types
//!
//! AG-UI style events streamed to clients. Every event carries a `type` tag
//! (`RUN_STARTED`, `TEXT_MESSAGE_CONTENT`, ...), camelCase fields and a
//! millisecond timestamp.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names used in `CUSTOM` events.
pub mod custom {
    pub const AGENT_ACTIVITY: &str = "agent_activity";
    pub const AGENT_RESULT: &str = "agent_result";
    pub const WORKFLOW_UPDATE: &str = "workflow_update";
    pub const PROJECT_PLAN: &str = "project_plan";
    pub const FILE_STARTED: &str = "file_started";
    pub const FILE_COMPLETED: &str = "file_completed";
    pub const FILE_UPDATED: &str = "file_updated";
    pub const CODE_UPDATE: &str = "code_update";
    pub const STAGE_WARNING: &str = "stage_warning";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

/// One JSON-Patch operation in a `STATE_DELTA`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl PatchOp {
    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum EventBody {
    RunStarted {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        input: Value,
    },
    RunFinished {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        result: Value,
    },
    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    StepStarted {
        step_name: String,
    },
    StepFinished {
        step_name: String,
    },
    TextMessageStart {
        message_id: String,
        role: String,
    },
    TextMessageContent {
        message_id: String,
        delta: String,
    },
    TextMessageEnd {
        message_id: String,
    },
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },
    ToolCallArgs {
        tool_call_id: String,
        delta: String,
    },
    ToolCallEnd {
        tool_call_id: String,
    },
    ToolCallResult {
        message_id: String,
        tool_call_id: String,
        content: String,
        role: String,
    },
    StateSnapshot {
        snapshot: Value,
    },
    StateDelta {
        delta: Vec<PatchOp>,
    },
    Custom {
        name: String,
        value: Value,
    },
}

/// A timestamped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    #[serde(flatten)]
    pub body: EventBody,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl ProtocolEvent {
    pub fn new(body: EventBody) -> Self {
        Self {
            body,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match &self.body {
            EventBody::RunStarted { .. } => "RUN_STARTED",
            EventBody::RunFinished { .. } => "RUN_FINISHED",
            EventBody::RunError { .. } => "RUN_ERROR",
            EventBody::StepStarted { .. } => "STEP_STARTED",
            EventBody::StepFinished { .. } => "STEP_FINISHED",
            EventBody::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            EventBody::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            EventBody::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            EventBody::ToolCallStart { .. } => "TOOL_CALL_START",
            EventBody::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            EventBody::ToolCallEnd { .. } => "TOOL_CALL_END",
            EventBody::ToolCallResult { .. } => "TOOL_CALL_RESULT",
            EventBody::StateSnapshot { .. } => "STATE_SNAPSHOT",
            EventBody::StateDelta { .. } => "STATE_DELTA",
            EventBody::Custom { .. } => "CUSTOM",
        }
    }

    /// True for `RUN_FINISHED` and `RUN_ERROR`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.body,
            EventBody::RunFinished { .. } | EventBody::RunError { .. }
        )
    }

    /// Name of a `CUSTOM` event.
    pub fn custom_name(&self) -> Option<&str> {
        match &self.body {
            EventBody::Custom { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Step name of a `STEP_STARTED` / `STEP_FINISHED` event.
    pub fn step_name(&self) -> Option<&str> {
        match &self.body {
            EventBody::StepStarted { step_name } | EventBody::StepFinished { step_name } => {
                Some(step_name)
            }
            _ => None,
        }
    }
}
