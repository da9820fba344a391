//! Scope Classifier
//!
//! Decides whether a request needs one file or a project. A keyword scan
//! always runs alongside the model call and can only escalate: if either side
//! says "multi", the answer is multi.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::AgentContext;
use crate::normalize;
use crate::prompts::{CLASSIFIER_BUDGET, CLASSIFIER_PROMPT};
use uber_codegen_core::PipelineMode;

/// Phrases that mark a request as a multi-file project, checked in order.
const MULTI_FILE_SIGNALS: &[&str] = &[
    "app",
    "application",
    "website",
    "web app",
    "project",
    "full-stack",
    "fullstack",
    "frontend",
    "backend",
    "rest api",
    "crud",
    "dashboard",
    "landing page",
    "multiple files",
    "multi-file",
    "multi file",
    "with tests",
    "with database",
    "with auth",
    "with components",
    "with modules",
    "with routes",
    "react",
    "flask",
    "django",
    "fastapi",
    "express",
    "next.js",
    "nextjs",
    "vue",
    "angular",
    "svelte",
    "todo app",
    "todo application",
    "chat app",
    "chat application",
    "e-commerce",
    "ecommerce",
    "blog",
    "portfolio",
    "social media",
    "inventory",
    "management system",
    "login",
    "signup",
    "authentication",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub mode: PipelineMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// True when the model's verdict was used
    pub ai_powered: bool,
}

impl Classification {
    pub fn single() -> Self {
        Self {
            mode: PipelineMode::Single,
            reason: None,
            ai_powered: false,
        }
    }

    pub fn is_multi(&self) -> bool {
        self.mode == PipelineMode::Multi
    }
}

/// Keyword scan over the lowercased prompt.
pub fn heuristic_classify(prompt: &str) -> Classification {
    let lower = prompt.to_lowercase();
    MULTI_FILE_SIGNALS
        .iter()
        .find(|signal| lower.contains(*signal))
        .map(|signal| Classification {
            mode: PipelineMode::Multi,
            reason: Some(format!("detected '{}' in prompt", signal)),
            ai_powered: false,
        })
        .unwrap_or_else(Classification::single)
}

pub struct ClassifierAgent {
    ctx: AgentContext,
}

impl ClassifierAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn classify(&self, prompt: &str) -> Classification {
        let heuristic = heuristic_classify(prompt);

        let raw = self
            .ctx
            .call(CLASSIFIER_PROMPT, prompt, CLASSIFIER_BUDGET)
            .await;
        let verdict = uber_codegen_interpreter::parse(raw.as_deref()).and_then(|parsed| {
            let mode = match normalize::text(&parsed, "mode")?.to_lowercase().as_str() {
                "single" => PipelineMode::Single,
                "multi" => PipelineMode::Multi,
                _ => return None,
            };
            Some(Classification {
                mode,
                reason: normalize::text(&parsed, "reason"),
                ai_powered: true,
            })
        });

        match verdict {
            Some(model) if model.is_multi() => model,
            Some(model) if heuristic.is_multi() => {
                info!(
                    "[Classifier] model said single, keyword scan escalates: {}",
                    heuristic.reason.as_deref().unwrap_or_default()
                );
                Classification {
                    ai_powered: model.ai_powered,
                    ..heuristic
                }
            }
            Some(model) => model,
            None => {
                warn!("[Classifier] model verdict unavailable, using keyword scan");
                heuristic
            }
        }
    }
}
