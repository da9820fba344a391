//! Run State
//!
//! Everything one run mutates while it moves through the stages, plus the
//! event helpers every stage shares. Stage logic lives in `single`, `multi`
//! and `analysis` as further `impl RunState` blocks.

use std::any::Any;

use serde_json::{json, Value};
use tracing::warn;

use uber_codegen_agents::AgentContext;
use uber_codegen_core::StageKind;

use super::workflow::WorkflowTracker;
use crate::models::run::{PipelineRun, RunPhase};
use crate::services::protocol::{custom, EventEncoder, EventEmitter, PatchOp};
use crate::utils::error::AppResult;

pub(super) struct RunState {
    pub(super) ctx: AgentContext,
    pub(super) emitter: EventEmitter,
    pub(super) encoder: EventEncoder,
    pub(super) workflow: WorkflowTracker,
    pub(super) run: PipelineRun,
    /// Message the generated code streams under; parent of fix tool calls
    pub(super) message_id: String,
}

impl RunState {
    pub(super) fn new(
        ctx: AgentContext,
        emitter: EventEmitter,
        prompt: &str,
        stages: &[StageKind],
    ) -> Self {
        let encoder = emitter.encoder().clone();
        let run = PipelineRun::new(encoder.run_id(), encoder.thread_id(), prompt);
        Self {
            ctx,
            emitter,
            encoder,
            workflow: WorkflowTracker::new(stages),
            run,
            message_id: crate::services::protocol::new_id("msg"),
        }
    }

    pub(super) async fn begin_step(&mut self, stage: StageKind) {
        self.workflow.start(stage);
        self.emitter
            .emit(self.encoder.step_started(stage.agent_name()))
            .await;
        self.set_phase(RunPhase::for_stage(stage)).await;
        self.workflow_update(stage).await;
    }

    /// Complete the step and return its duration in seconds.
    pub(super) async fn end_step(&mut self, stage: StageKind, message: Option<String>) -> f64 {
        let duration = self.workflow.complete(stage, message);
        self.workflow_update(stage).await;
        self.emitter
            .emit(self.encoder.step_finished(stage.agent_name()))
            .await;
        duration
    }

    async fn workflow_update(&self, current: StageKind) {
        self.emitter
            .custom(
                custom::WORKFLOW_UPDATE,
                json!({
                    "workflow": self.workflow.steps(),
                    "currentStep": current.agent_name(),
                }),
            )
            .await;
    }

    pub(super) async fn activity(
        &self,
        stage: StageKind,
        phase: &str,
        message: impl Into<String>,
        progress: Option<u32>,
        stats: Option<Value>,
    ) {
        let mut value = json!({
            "agentId": stage.agent_name(),
            "agentName": stage.display_name(),
            "phase": phase,
            "message": message.into(),
        });
        if let Some(progress) = progress {
            value["progress"] = json!(progress);
        }
        if let Some(stats) = stats {
            value["stats"] = stats;
        }
        self.emitter.custom(custom::AGENT_ACTIVITY, value).await;
    }

    /// Record a non-fatal problem: log it, keep it on the run and tell the client.
    pub(super) async fn warn_stage(&mut self, stage: StageKind, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {}", stage.display_name(), message);
        self.run
            .warnings
            .push(format!("{}: {}", stage.agent_name(), message));
        self.emitter
            .emit(self.encoder.stage_warning(stage.agent_name(), &message))
            .await;
    }

    async fn set_phase(&mut self, phase: RunPhase) {
        self.run.phase = phase;
        self.emitter
            .emit(self.encoder.state_delta(vec![PatchOp::replace(
                "/phase",
                serde_json::to_value(phase).unwrap_or(Value::Null),
            )]))
            .await;
    }

    /// Final snapshot of the run.
    pub(super) fn snapshot(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(&self.run)?)
    }

    pub(super) fn into_run(self) -> PipelineRun {
        self.run
    }
}

/// Readable text from a panic payload.
pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
