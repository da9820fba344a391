//! Analysis Stages
//!
//! Validator, tester and security, in that order. Each stage sees the
//! artifact as the previous stage left it. A replacement is accepted only
//! when it keeps every file marker and does not unbalance delimiters that
//! were balanced before; rejected replacements leave the artifact unchanged.
//!
//! Multi-file artifacts are analyzed as one marker-separated bundle of the
//! executable source files.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use uber_codegen_agents::{
    AgentContext, AnalysisAgent, SecurityAgent, TesterAgent, ValidatorAgent,
};
use uber_codegen_core::artifact::{file_markers, join_files, markers_match, merge_bundle};
use uber_codegen_core::{is_executable_source, CodeArtifact, StageKind, StageResult};

use super::guards::artifact_is_balanced;
use super::state::{panic_message, RunState};
use crate::services::protocol::{custom, PatchOp};

/// The artifact-rewriting stages in execution order.
pub fn analysis_agents(ctx: &AgentContext) -> Vec<Box<dyn AnalysisAgent>> {
    vec![
        Box::new(ValidatorAgent::new(ctx.clone())),
        Box::new(TesterAgent::new(ctx.clone())),
        Box::new(SecurityAgent::new(ctx.clone())),
    ]
}

/// Text an analysis stage sees for `artifact`, `None` when there is nothing to analyze.
pub fn analysis_input(artifact: &CodeArtifact) -> Option<String> {
    let text = match artifact {
        CodeArtifact::Single(code) => code.clone(),
        CodeArtifact::Multi(files) => {
            join_files(files.iter().filter(|(path, _)| is_executable_source(path)))
        }
    };
    (!text.trim().is_empty()).then_some(text)
}

/// Why a replacement must be rejected, if it must.
pub fn replacement_violation(before: &str, after: &str) -> Option<String> {
    if !markers_match(before, after) {
        return Some(format!(
            "replacement dropped, reordered or renamed files (expected {} file markers, got {}); keeping previous code",
            file_markers(before).len(),
            file_markers(after).len()
        ));
    }
    if artifact_is_balanced(before) && !artifact_is_balanced(after) {
        return Some("replacement has unbalanced delimiters; keeping previous code".to_string());
    }
    None
}

impl RunState {
    pub(super) async fn run_analysis_stages(&mut self) {
        for agent in analysis_agents(&self.ctx) {
            self.run_analysis_stage(agent.as_ref()).await;
        }
    }

    async fn run_analysis_stage(&mut self, agent: &dyn AnalysisAgent) {
        let stage = agent.stage();
        self.begin_step(stage).await;
        self.activity(stage, "analyzing", analyzing_message(stage), Some(0), None)
            .await;

        let mut result = match analysis_input(&self.run.code) {
            None => {
                let mut skipped = StageResult::new(stage, "skipped");
                skipped.message = "No source files to analyze".to_string();
                skipped
            }
            Some(input) => {
                let mut result = match AssertUnwindSafe(agent.analyze(&input))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        error!("[{}] stage crashed: {}", stage.display_name(), reason);
                        StageResult::degraded(stage, format!("stage crashed: {}", reason))
                    }
                };
                self.apply_replacement(&mut result, &input).await;
                result
            }
        };

        if result.degraded {
            let crashed = result.status == "degraded";
            let reason = match result.warnings.first() {
                Some(warning) if crashed => warning.clone(),
                _ => "model unavailable, heuristic analysis used".to_string(),
            };
            self.warn_stage(stage, reason).await;
        }

        if result.message.is_empty() {
            result.message = format!("{} complete", stage.display_name());
        }
        let stats = stage_stats(&result);
        self.activity(stage, "complete", result.message.clone(), Some(100), Some(stats))
            .await;
        self.emitter
            .custom(
                custom::AGENT_RESULT,
                json!({
                    "agentId": stage.agent_name(),
                    "result": serde_json::to_value(&result).unwrap_or_default(),
                }),
            )
            .await;
        self.end_step(stage, Some(result.message.clone())).await;
        self.run.record_stage(result);
    }

    /// Accept or reject the stage's replacement and update the artifact.
    async fn apply_replacement(&mut self, result: &mut StageResult, input: &str) {
        let stage = result.stage;
        if !result.has_changes() {
            if !result.fixes.is_empty() {
                result.discard_fix("fixes reported without replacement code; ignored");
            } else if result.fixed_code.take().is_some() {
                debug!("[{}] replacement without fixes ignored", stage.display_name());
            }
            return;
        }

        let Some(fixed) = result.fixed_code.clone() else {
            return;
        };
        if let Some(violation) = replacement_violation(input, &fixed) {
            result.discard_fix(violation.clone());
            self.warn_stage(stage, violation).await;
            return;
        }

        let merged = match &self.run.code {
            CodeArtifact::Single(_) => Ok(CodeArtifact::Single(fixed)),
            CodeArtifact::Multi(files) => merge_bundle(files, &fixed).map(CodeArtifact::Multi),
        };
        let replacement = match merged {
            Ok(replacement) => replacement,
            Err(e) => {
                let warning = format!("{}; keeping previous code", e);
                result.discard_fix(warning.clone());
                self.warn_stage(stage, warning).await;
                return;
            }
        };
        if replacement == self.run.code {
            debug!("[{}] replacement is identical, nothing applied", stage.display_name());
            result.fixed_code = None;
            result.fixes.clear();
            return;
        }

        info!(
            "[{}] applied {} fixes",
            stage.display_name(),
            result.fixes.len()
        );
        self.emit_fix_calls(stage, result).await;
        self.emit_code_update(stage, &replacement).await;
        self.run.all_fixes.extend(result.fixes.iter().cloned());
        self.run.code = replacement;
    }

    async fn emit_fix_calls(&self, stage: StageKind, result: &StageResult) {
        let tool_name = format!("{}_fix", stage.agent_name());
        for fix in &result.fixes {
            let content = format!("Applied: {}", fix.description);
            match self
                .encoder
                .tool_call(&tool_name, fix, &content, Some(&self.message_id))
            {
                Ok(events) => self.emitter.emit_all(events).await,
                Err(e) => debug!("[{}] could not encode fix event: {}", stage.display_name(), e),
            }
        }
    }

    /// Per-file and whole-artifact updates for an accepted replacement.
    async fn emit_code_update(&self, stage: StageKind, replacement: &CodeArtifact) {
        if let (CodeArtifact::Multi(before), CodeArtifact::Multi(after)) =
            (&self.run.code, replacement)
        {
            for (path, content) in after {
                let previous = before.get(path);
                if previous == Some(content) {
                    continue;
                }
                self.emitter
                    .custom(
                        custom::FILE_UPDATED,
                        json!({
                            "path": path,
                            "content": content,
                            "previousContent": previous,
                            "agentId": stage.agent_name(),
                        }),
                    )
                    .await;
            }
        }
        let code = serde_json::to_value(replacement).unwrap_or(Value::Null);
        self.emitter
            .emit(self.encoder.state_delta(vec![PatchOp::replace("/code", code.clone())]))
            .await;
        self.emitter
            .custom(
                custom::CODE_UPDATE,
                json!({ "agentId": stage.agent_name(), "code": code }),
            )
            .await;
    }
}

fn analyzing_message(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Validator => "Checking syntax and style...",
        StageKind::Tester => "Analyzing testability...",
        StageKind::Security => "Scanning for vulnerabilities...",
        _ => "Analyzing...",
    }
}

fn stage_stats(result: &StageResult) -> Value {
    let fixes = result.fixes.len();
    match result.stage {
        StageKind::Validator => json!({
            "issuesFound": result.issues.len(),
            "fixesApplied": fixes,
        }),
        StageKind::Tester => json!({
            "testabilityScore": result.score,
            "fixesApplied": fixes,
        }),
        StageKind::Security => json!({
            "riskLevel": result.risk_level,
            "vulnerabilities": result.findings.len(),
            "fixesApplied": fixes,
        }),
        _ => json!({ "fixesApplied": fixes }),
    }
}
