//! Multi-File Generation
//!
//! Planning, then one streamed generation per planned file in plan order.
//! Each file's request sees the files generated before it.

use serde_json::json;

use uber_codegen_agents::{GeneratorAgent, PlannerAgent};
use uber_codegen_core::{CodeArtifact, FileBundle, ProjectPlan, StageKind};
use uber_codegen_interpreter::strip_markdown_fences;

use super::state::RunState;
use crate::services::protocol::{custom, new_id, PatchOp};

impl RunState {
    pub(super) async fn plan_project(&mut self, prompt: &str) -> ProjectPlan {
        let stage = StageKind::Planner;
        self.begin_step(stage).await;
        self.activity(stage, "planning", "Planning project structure...", Some(0), None)
            .await;

        let outcome = PlannerAgent::new(self.ctx.clone()).plan(prompt).await;
        if !outcome.ai_powered {
            self.warn_stage(stage, "model plan unavailable, using the default project layout")
                .await;
        }
        let plan = outcome.plan;

        self.emitter
            .custom(custom::PROJECT_PLAN, serde_json::to_value(&plan).unwrap_or_default())
            .await;
        let summary = format!("Planned {} files for {}", plan.files.len(), plan.project_name);
        self.activity(
            stage,
            "complete",
            summary.clone(),
            Some(100),
            Some(json!({ "files": plan.files.len(), "aiPowered": outcome.ai_powered })),
        )
        .await;
        self.run.plan = Some(plan.clone());
        self.end_step(stage, Some(summary)).await;
        plan
    }

    pub(super) async fn generate_project(&mut self, prompt: &str, plan: &ProjectPlan) {
        let stage = StageKind::Generator;
        self.begin_step(stage).await;

        let generator = GeneratorAgent::new(self.ctx.clone());
        let total = plan.files.len();
        let mut files = FileBundle::new();
        let mut ai_powered = false;

        for (index, spec) in plan.files.iter().enumerate() {
            self.emitter
                .custom(
                    custom::FILE_STARTED,
                    json!({
                        "path": spec.path,
                        "purpose": spec.purpose,
                        "language": spec.language,
                        "index": index,
                        "total": total,
                    }),
                )
                .await;
            self.activity(
                stage,
                "generating",
                format!("Generating {} ({}/{})", spec.path, index + 1, total),
                Some(progress(index, total)),
                None,
            )
            .await;

            let stream = generator.generate_file(prompt, spec, plan, &files);
            let message_id = new_id("msg");
            let (raw, outcome) = self.stream_message(&message_id, stream).await;
            let content = strip_markdown_fences(&raw);

            ai_powered |= outcome.ai_powered;
            if let Some(warning) = outcome.warning.filter(|_| outcome.degraded) {
                self.warn_stage(stage, format!("{}: {}", spec.path, warning))
                    .await;
            }

            let lines = content.lines().count();
            files.insert(spec.path.clone(), content);
            self.emitter
                .custom(
                    custom::FILE_COMPLETED,
                    json!({
                        "path": spec.path,
                        "language": spec.language,
                        "lines": lines,
                        "index": index,
                        "total": total,
                        "aiPowered": outcome.ai_powered,
                    }),
                )
                .await;
        }

        self.run.ai_powered = ai_powered;
        self.run.code = CodeArtifact::Multi(files.clone());
        self.run.original_code = Some(CodeArtifact::Multi(files.clone()));
        self.emitter
            .emit(self.encoder.state_delta(vec![PatchOp::replace(
                "/code",
                serde_json::to_value(&files).unwrap_or_default(),
            )]))
            .await;

        let summary = format!("Generated {} files", files.len());
        self.activity(
            stage,
            "complete",
            summary.clone(),
            Some(100),
            Some(json!({
                "files": files.len(),
                "lines": self.run.code.line_count(),
            })),
        )
        .await;
        self.end_step(stage, Some(summary)).await;
    }
}

fn progress(index: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (index * 100 / total) as u32
}
