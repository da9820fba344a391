//! Project Planner
//!
//! Produces the ordered file list for a multi-file run. When the model is
//! unavailable or returns no usable files, a fixed four-file Python layout is
//! used instead.

use serde_json::Value;
use tracing::{info, warn};

use crate::agent::AgentContext;
use crate::normalize;
use crate::prompts::{PLANNER_BUDGET, PLANNER_PROMPT};
use uber_codegen_core::artifact::is_marker_path;
use uber_codegen_core::plan::{is_executable_source, FileSpec, ProjectPlan};

const FALLBACK_PROJECT_NAME: &str = "generated-project";
const FALLBACK_DESCRIPTION_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub plan: ProjectPlan,
    pub ai_powered: bool,
}

pub struct PlannerAgent {
    ctx: AgentContext,
}

impl PlannerAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn plan(&self, prompt: &str) -> PlanOutcome {
        let raw = self.ctx.call(PLANNER_PROMPT, prompt, PLANNER_BUDGET).await;
        let parsed = uber_codegen_interpreter::parse(raw.as_deref());

        if let Some(plan) = parsed.as_ref().and_then(plan_from_response) {
            info!(
                "[Planner] planned {} files for {}",
                plan.files.len(),
                plan.project_name
            );
            return PlanOutcome {
                plan,
                ai_powered: true,
            };
        }

        warn!("[Planner] no usable plan from model, using fallback layout");
        PlanOutcome {
            plan: fallback_plan(prompt),
            ai_powered: false,
        }
    }
}

fn plan_from_response(parsed: &serde_json::Map<String, Value>) -> Option<ProjectPlan> {
    let files: Vec<FileSpec> = parsed
        .get("files")?
        .as_array()?
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let path = sanitize_path(obj.get("path")?.as_str()?)?;
            let purpose = normalize::text(obj, "purpose").unwrap_or_default();
            let language = normalize::text(obj, "language").unwrap_or_default();
            Some(FileSpec::new(path, purpose, &language))
        })
        .collect();

    let plan = ProjectPlan::new(
        normalize::text(parsed, "project_name").unwrap_or_else(|| "project".into()),
        normalize::text(parsed, "description").unwrap_or_default(),
        files,
    );
    (!plan.files.is_empty()).then_some(plan)
}

/// Relative, normalized path, or `None` for absolute or parent-escaping paths.
///
/// Inner whitespace becomes `_` so every source file can be named by a
/// bundle separator line.
fn sanitize_path(raw: &str) -> Option<String> {
    let path = raw
        .trim()
        .trim_start_matches("./")
        .replace('\\', "/")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if path.is_empty() || path.starts_with('/') || path.split('/').any(|part| part == "..") {
        return None;
    }
    if is_executable_source(&path) && !is_marker_path(&path) {
        return None;
    }
    Some(path)
}

/// Four-file layout used when no plan can be obtained.
pub fn fallback_plan(prompt: &str) -> ProjectPlan {
    ProjectPlan::new(
        FALLBACK_PROJECT_NAME,
        prompt.chars().take(FALLBACK_DESCRIPTION_CHARS).collect::<String>(),
        vec![
            FileSpec::new("README.md", "Project documentation", "markdown"),
            FileSpec::new("requirements.txt", "Dependencies", "text"),
            FileSpec::new("main.py", "Application entry point", "python"),
            FileSpec::new("utils.py", "Helper utilities", "python"),
        ],
    )
}
