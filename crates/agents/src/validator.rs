//! Validator Agent
//!
//! Style, syntax and best-practice review. The heuristic flags overlong
//! lines, tab indentation and wildcard imports.

use async_trait::async_trait;
use serde_json::json;

use crate::agent::{AgentContext, AnalysisAgent};
use crate::normalize;
use crate::prompts::{validator_input, VALIDATOR_BUDGET, VALIDATOR_PROMPT};
use uber_codegen_core::{StageKind, StageResult};
use uber_codegen_interpreter::JsonMap;

const MAX_LINE_LEN: usize = 120;

const KNOWN_KEYS: &[&str] = &["status", "issues", "warnings", "fixes_applied", "fixed_code"];

pub struct ValidatorAgent {
    ctx: AgentContext,
}

impl ValidatorAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn validate(&self, code: &str) -> StageResult {
        self.analyze(code).await
    }
}

#[async_trait]
impl AnalysisAgent for ValidatorAgent {
    fn stage(&self) -> StageKind {
        StageKind::Validator
    }

    fn context(&self) -> &AgentContext {
        &self.ctx
    }

    fn instructions(&self) -> &'static str {
        VALIDATOR_PROMPT
    }

    fn token_budget(&self) -> u32 {
        VALIDATOR_BUDGET
    }

    fn build_input(&self, code: &str) -> String {
        validator_input(code)
    }

    fn parse_response(&self, parsed: JsonMap) -> StageResult {
        let status = normalize::text(&parsed, "status").unwrap_or_else(|| "warnings".into());
        let mut result = StageResult::new(StageKind::Validator, status);
        result.issues = normalize::string_list(parsed.get("issues"));
        result.warnings = normalize::string_list(parsed.get("warnings"));
        result.fixes = normalize::fix_records(StageKind::Validator, parsed.get("fixes_applied"));
        result.fixed_code = normalize::fixed_code(parsed.get("fixed_code"));
        result.details = normalize::remaining(&parsed, KNOWN_KEYS);

        let verdict = if result.status == "passed" {
            "Validation passed"
        } else {
            "Found issues"
        };
        result.message = format!(
            "{} - {} issues, {} fixes",
            verdict,
            result.issues.len(),
            result.fixes.len()
        );
        result
    }

    fn run_heuristic(&self, code: &str) -> StageResult {
        let mut issues = Vec::new();

        for (index, line) in code.lines().enumerate() {
            let number = index + 1;
            if line.chars().count() > MAX_LINE_LEN {
                issues.push(format!("Line {}: exceeds {} characters", number, MAX_LINE_LEN));
            }
            if line.contains('\t') {
                issues.push(format!("Line {}: uses tabs instead of spaces", number));
            }
        }
        if code.contains("import *") {
            issues.push("Wildcard imports detected - avoid 'from x import *'".to_string());
        }

        let status = if issues.is_empty() { "passed" } else { "warnings" };
        let mut result = StageResult::new(StageKind::Validator, status);
        result.message = format!("Found {} issue(s)", issues.len());
        result.issues = issues;
        result.details.insert(
            "stats".into(),
            json!({
                "functions": code.matches("def ").count() + code.matches("function ").count(),
                "classes": code.matches("class ").count(),
                "lines": code.lines().count(),
            }),
        );
        result
    }
}
