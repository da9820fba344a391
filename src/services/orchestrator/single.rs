//! Single-File Generation
//!
//! Classification and the streamed single-file generator step.

use serde_json::json;
use tracing::info;

use uber_codegen_agents::{ClassifierAgent, GenerationOutcome, GenerationStream, GeneratorAgent};
use uber_codegen_core::{CodeArtifact, PipelineMode, StageKind};
use uber_codegen_interpreter::strip_markdown_fences;

use super::state::RunState;
use crate::services::protocol::PatchOp;

impl RunState {
    /// Decide single vs multi and record it on the run.
    pub(super) async fn classify(&mut self, prompt: &str) -> PipelineMode {
        let stage = StageKind::Classifier;
        self.begin_step(stage).await;
        self.activity(stage, "analyzing", "Analyzing request scope...", Some(0), None)
            .await;

        let classification = ClassifierAgent::new(self.ctx.clone())
            .classify(prompt)
            .await;
        info!(
            "[Pipeline] classified as {} (ai_powered={})",
            classification.mode.as_str(),
            classification.ai_powered
        );

        self.run.mode = classification.mode;
        self.run.mode_reason = classification.reason.clone();
        if classification.is_multi() {
            self.workflow
                .insert_after(StageKind::Classifier, StageKind::Planner);
        }
        self.emitter
            .emit(self.encoder.state_delta(vec![PatchOp::replace(
                "/mode",
                classification.mode.as_str(),
            )]))
            .await;

        let summary = match classification.mode {
            PipelineMode::Single => "Single file",
            PipelineMode::Multi => "Multi-file project",
        };
        self.activity(
            stage,
            "complete",
            summary,
            Some(100),
            Some(json!({
                "mode": classification.mode,
                "reason": classification.reason,
                "aiPowered": classification.ai_powered,
            })),
        )
        .await;
        self.end_step(stage, Some(summary.to_string())).await;
        classification.mode
    }

    pub(super) async fn generate_single(&mut self, prompt: &str) {
        let stage = StageKind::Generator;
        self.begin_step(stage).await;
        self.activity(stage, "starting", "Generating code...", Some(0), None)
            .await;

        let stream = GeneratorAgent::new(self.ctx.clone()).generate_single(prompt);
        let message_id = self.message_id.clone();
        let (raw, outcome) = self.stream_message(&message_id, stream).await;
        let code = strip_markdown_fences(&raw);

        self.run.ai_powered = outcome.ai_powered;
        if let Some(warning) = outcome.warning.filter(|_| outcome.degraded) {
            self.warn_stage(stage, warning).await;
        }

        let lines = code.lines().count();
        let chars = code.chars().count();
        self.run.code = CodeArtifact::Single(code.clone());
        self.run.original_code = Some(CodeArtifact::Single(code.clone()));
        self.emitter
            .emit(self.encoder.state_delta(vec![PatchOp::replace("/code", code)]))
            .await;

        self.activity(
            stage,
            "complete",
            format!("Generated {} lines", lines),
            Some(100),
            Some(json!({ "lines": lines, "chars": chars })),
        )
        .await;
        self.end_step(stage, None).await;
    }

    /// Forward every fragment as `TEXT_MESSAGE_CONTENT` and return the raw text.
    pub(super) async fn stream_message(
        &mut self,
        message_id: &str,
        mut stream: GenerationStream,
    ) -> (String, GenerationOutcome) {
        self.emitter.emit(self.encoder.text_start(message_id)).await;
        let mut raw = String::new();
        while let Some(fragment) = stream.next_fragment().await {
            raw.push_str(&fragment);
            self.emitter
                .emit(self.encoder.text_content(message_id, fragment))
                .await;
        }
        self.emitter.emit(self.encoder.text_end(message_id)).await;
        (raw, stream.outcome().clone())
    }
}
