//! Pipeline Run Models
//!
//! The record a run accumulates: workflow steps, the evolving artifact,
//! stage results, the aggregated fix list and summary stats. Serialized as the
//! final state snapshot and as the single-shot response.

use serde::{Deserialize, Serialize};

use uber_codegen_core::{
    detect_language, CodeArtifact, FixRecord, PipelineMode, ProjectPlan, StageKind, StageResult,
};

/// Lifecycle of one workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Active,
    Complete,
    Error,
}

/// One stage of the run as clients render it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    /// Seconds, set once the step finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkflowStep {
    pub fn pending(stage: StageKind) -> Self {
        Self {
            id: stage.agent_name().to_string(),
            name: stage.display_name().to_string(),
            status: StepStatus::Pending,
            duration: None,
            message: None,
        }
    }
}

/// A generated file with its fix history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
    /// Content as generated, present only if a stage changed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,
    pub language: String,
    #[serde(default)]
    pub purpose: String,
    pub lines: usize,
    pub was_fixed: bool,
}

impl ProjectFile {
    pub fn new(path: &str, content: &str, original: Option<&str>, purpose: &str) -> Self {
        let was_fixed = original.is_some_and(|o| o != content);
        Self {
            path: path.to_string(),
            content: content.to_string(),
            original_content: if was_fixed { original.map(str::to_string) } else { None },
            language: detect_language(path).to_string(),
            purpose: purpose.to_string(),
            lines: content.lines().count(),
            was_fixed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Seconds
    pub total_duration: f64,
    pub total_lines: usize,
    pub total_fixes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
}

/// Where a run is: the stage in progress, then a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Starting,
    Classifying,
    Planning,
    Generating,
    Validating,
    Testing,
    Securing,
    Complete,
    Error,
}

impl RunPhase {
    /// Phase while `stage` runs.
    pub fn for_stage(stage: StageKind) -> Self {
        match stage {
            StageKind::Classifier => RunPhase::Classifying,
            StageKind::Planner => RunPhase::Planning,
            StageKind::Generator => RunPhase::Generating,
            StageKind::Validator => RunPhase::Validating,
            StageKind::Tester => RunPhase::Testing,
            StageKind::Security => RunPhase::Securing,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub thread_id: String,
    pub prompt: String,
    pub mode: PipelineMode,
    /// Why the classifier escalated to multi-file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_reason: Option<String>,
    pub code: CodeArtifact,
    /// Artifact as generated, present only if a stage changed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_code: Option<CodeArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ProjectPlan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ProjectFile>,
    /// Applied fixes in stage order
    pub all_fixes: Vec<FixRecord>,
    pub total_fixes: usize,
    pub code_was_fixed: bool,
    pub workflow: Vec<WorkflowStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<StageResult>,
    /// Generation ran on the model rather than the canned fallback
    pub ai_powered: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub stats: RunStats,
    pub phase: RunPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineRun {
    pub fn new(
        run_id: impl Into<String>,
        thread_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            thread_id: thread_id.into(),
            prompt: prompt.into(),
            mode: PipelineMode::Single,
            mode_reason: None,
            code: CodeArtifact::default(),
            original_code: None,
            plan: None,
            files: Vec::new(),
            all_fixes: Vec::new(),
            total_fixes: 0,
            code_was_fixed: false,
            workflow: Vec::new(),
            validation: None,
            tests: None,
            security: None,
            ai_powered: false,
            warnings: Vec::new(),
            stats: RunStats::default(),
            phase: RunPhase::Starting,
            error: None,
        }
    }

    /// Store an analysis stage result in its slot.
    pub fn record_stage(&mut self, result: StageResult) {
        match result.stage {
            StageKind::Validator => self.validation = Some(result),
            StageKind::Tester => self.tests = Some(result),
            StageKind::Security => self.security = Some(result),
            _ => {}
        }
    }

    pub fn stage(&self, stage: StageKind) -> Option<&StageResult> {
        match stage {
            StageKind::Validator => self.validation.as_ref(),
            StageKind::Tester => self.tests.as_ref(),
            StageKind::Security => self.security.as_ref(),
            _ => None,
        }
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.workflow.iter().find(|s| s.id == id)
    }

    /// Single-file source text, if this is a single-file run.
    pub fn code_text(&self) -> Option<&str> {
        self.code.as_single()
    }

    /// Fill in totals, the fixed flag and the per-file view.
    pub fn finalize(&mut self, total_duration: f64) {
        self.total_fixes = self.all_fixes.len();
        if self.original_code.as_ref() == Some(&self.code) {
            self.original_code = None;
        }
        self.code_was_fixed = self.original_code.is_some();

        if let CodeArtifact::Multi(files) = &self.code {
            let original = self.original_code.as_ref().and_then(|c| c.files());
            let purposes = self.plan.as_ref();
            self.files = files
                .iter()
                .map(|(path, content)| {
                    let purpose = purposes
                        .and_then(|p| p.files.iter().find(|f| &f.path == path))
                        .map(|f| f.purpose.as_str())
                        .unwrap_or_default();
                    let before = original.and_then(|o| o.get(path)).map(String::as_str);
                    ProjectFile::new(path, content, before, purpose)
                })
                .collect();
        }

        self.stats = RunStats {
            total_duration: (total_duration * 100.0).round() / 100.0,
            total_lines: self.code.line_count(),
            total_fixes: self.total_fixes,
            total_files: self.code.files().map(|f| f.len()),
        };
    }
}
