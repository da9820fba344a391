//! Testing Agent
//!
//! Reviews testability and adds error handling or input validation. The
//! heuristic scores code by the presence of error handling and guard clauses.

use async_trait::async_trait;
use serde_json::json;

use crate::agent::{AgentContext, AnalysisAgent};
use crate::normalize;
use crate::prompts::{tester_input, TESTER_BUDGET, TESTER_PROMPT};
use uber_codegen_core::{StageKind, StageResult};
use uber_codegen_interpreter::JsonMap;

const KNOWN_KEYS: &[&str] = &[
    "status",
    "testability_score",
    "issues_found",
    "issues",
    "warnings",
    "fixes_applied",
    "fixed_code",
];

const ERROR_HANDLING_MARKERS: &[&str] = &["try:", "try {", "catch (", "except "];
const GUARD_MARKERS: &[&str] = &["not ", "is None", "== null", "=== null", "undefined"];

pub struct TesterAgent {
    ctx: AgentContext,
}

impl TesterAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn test(&self, code: &str) -> StageResult {
        self.analyze(code).await
    }
}

#[async_trait]
impl AnalysisAgent for TesterAgent {
    fn stage(&self) -> StageKind {
        StageKind::Tester
    }

    fn context(&self) -> &AgentContext {
        &self.ctx
    }

    fn instructions(&self) -> &'static str {
        TESTER_PROMPT
    }

    fn token_budget(&self) -> u32 {
        TESTER_BUDGET
    }

    fn build_input(&self, code: &str) -> String {
        tester_input(code)
    }

    fn parse_response(&self, parsed: JsonMap) -> StageResult {
        let status = normalize::text(&parsed, "status").unwrap_or_else(|| "warnings".into());
        let mut result = StageResult::new(StageKind::Tester, status);
        result.score = normalize::score(parsed.get("testability_score"));
        result.issues = normalize::string_list(
            parsed.get("issues_found").or_else(|| parsed.get("issues")),
        );
        result.warnings = normalize::string_list(parsed.get("warnings"));
        result.fixes = normalize::fix_records(StageKind::Tester, parsed.get("fixes_applied"));
        result.fixed_code = normalize::fixed_code(parsed.get("fixed_code"));
        result.details = normalize::remaining(&parsed, KNOWN_KEYS);
        result.message = format!(
            "Score: {}/100 - {} fixes applied",
            result.score.unwrap_or(0),
            result.fixes.len()
        );
        result
    }

    fn run_heuristic(&self, code: &str) -> StageResult {
        let has_error_handling = ERROR_HANDLING_MARKERS.iter().any(|m| code.contains(m));
        let has_validation =
            code.contains("if ") && GUARD_MARKERS.iter().any(|m| code.contains(m));

        let status = if has_error_handling && has_validation {
            "all_passed"
        } else {
            "warnings"
        };
        let score = if has_error_handling { 70 } else { 50 };

        let mut result = StageResult::new(StageKind::Tester, status);
        result.score = Some(score);
        if !has_error_handling {
            result.issues.push("Missing error handling".to_string());
        }
        if !has_validation {
            result.issues.push("Missing input validation".to_string());
        }
        result.message = format!("Testability score: {}/100", score);
        result.details.insert(
            "suggested_tests".into(),
            json!(["Test with valid inputs", "Test with edge cases"]),
        );
        result
    }
}
