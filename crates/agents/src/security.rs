//! Security Agent
//!
//! Vulnerability scan with automatic fixes. The heuristic is a
//! case-insensitive substring scan over a fixed table of dangerous patterns,
//! each contributing 25 points of risk.

use async_trait::async_trait;
use serde_json::json;

use crate::agent::{AgentContext, AnalysisAgent};
use crate::normalize;
use crate::prompts::{security_input, SECURITY_BUDGET, SECURITY_PROMPT};
use uber_codegen_core::{Finding, Severity, StageKind, StageResult};
use uber_codegen_interpreter::JsonMap;

const RISK_PER_FINDING: u32 = 25;

const KNOWN_KEYS: &[&str] = &[
    "status",
    "risk_level",
    "risk_score",
    "vulnerabilities",
    "warnings",
    "fixes_applied",
    "fixed_code",
];

/// (pattern, severity, kind, description)
const DANGEROUS_PATTERNS: &[(&str, Severity, &str, &str)] = &[
    ("eval(", Severity::Critical, "Code Injection", "eval() can execute arbitrary code"),
    ("exec(", Severity::Critical, "Code Injection", "exec() can execute arbitrary code"),
    ("pickle.loads(", Severity::High, "Deserialization", "pickle.loads() can execute arbitrary code"),
    ("os.system(", Severity::High, "Command Injection", "os.system() is vulnerable to command injection"),
    ("subprocess.call(", Severity::Medium, "Command Injection", "Consider using subprocess.run with shell=False"),
    ("shell=True", Severity::High, "Command Injection", "shell=True enables command injection"),
    ("password =", Severity::Medium, "Hardcoded Secret", "Possible hardcoded password"),
    ("api_key =", Severity::Medium, "Hardcoded Secret", "Possible hardcoded API key"),
    ("secret =", Severity::Medium, "Hardcoded Secret", "Possible hardcoded secret"),
];

pub struct SecurityAgent {
    ctx: AgentContext,
}

impl SecurityAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn scan(&self, code: &str) -> StageResult {
        self.analyze(code).await
    }
}

/// First 1-based line containing `needle` (both already lowercased).
fn first_line(lowered: &str, needle: &str) -> Option<u32> {
    lowered
        .lines()
        .position(|line| line.contains(needle))
        .and_then(|index| u32::try_from(index + 1).ok())
}

#[async_trait]
impl AnalysisAgent for SecurityAgent {
    fn stage(&self) -> StageKind {
        StageKind::Security
    }

    fn context(&self) -> &AgentContext {
        &self.ctx
    }

    fn instructions(&self) -> &'static str {
        SECURITY_PROMPT
    }

    fn token_budget(&self) -> u32 {
        SECURITY_BUDGET
    }

    fn build_input(&self, code: &str) -> String {
        security_input(code)
    }

    fn parse_response(&self, parsed: JsonMap) -> StageResult {
        let findings = normalize::findings(StageKind::Security, parsed.get("vulnerabilities"));
        let status = normalize::text(&parsed, "status").unwrap_or_else(|| {
            if findings.is_empty() {
                "secure".into()
            } else {
                "vulnerabilities_found".into()
            }
        });

        let mut result = StageResult::new(StageKind::Security, status);
        result.score = normalize::score(parsed.get("risk_score"));
        let fallback_level = result
            .score
            .map(Severity::from_risk_score)
            .unwrap_or(Severity::Low);
        result.risk_level = Some(
            normalize::text(&parsed, "risk_level")
                .map(|level| Severity::parse_or(&level, fallback_level))
                .unwrap_or(fallback_level),
        );
        result.findings = findings;
        result.warnings = normalize::string_list(parsed.get("warnings"));
        result.fixes = normalize::fix_records(StageKind::Security, parsed.get("fixes_applied"));
        result.fixed_code = normalize::fixed_code(parsed.get("fixed_code"));
        result.details = normalize::remaining(&parsed, KNOWN_KEYS);

        let verdict = if result.findings.is_empty() {
            "Secure".to_string()
        } else {
            format!("{} vulnerabilities", result.findings.len())
        };
        result.message = format!("{} - {} fixes applied", verdict, result.fixes.len());
        result
    }

    fn run_heuristic(&self, code: &str) -> StageResult {
        let lowered = code.to_lowercase();
        let findings: Vec<Finding> = DANGEROUS_PATTERNS
            .iter()
            .filter_map(|(pattern, severity, kind, description)| {
                let needle = pattern.to_lowercase();
                lowered.contains(&needle).then(|| Finding {
                    kind: kind.to_string(),
                    severity: *severity,
                    description: description.to_string(),
                    pattern: Some(pattern.to_string()),
                    line: first_line(&lowered, &needle),
                })
            })
            .collect();

        let risk_score = (findings.len() as u32 * RISK_PER_FINDING).min(100);
        let status = if findings.is_empty() {
            "secure"
        } else {
            "vulnerabilities_found"
        };

        let mut result = StageResult::new(StageKind::Security, status);
        result.score = Some(risk_score);
        result.risk_level = Some(Severity::from_risk_score(risk_score));
        result.message = format!("Found {} vulnerability(ies)", findings.len());
        result.findings = findings;
        result.details.insert(
            "recommendations".into(),
            json!(["Review code manually for additional security issues"]),
        );
        result
    }
}
