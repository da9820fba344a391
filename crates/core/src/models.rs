//! Stage Data Model
//!
//! Types every stage agent produces and the orchestrator consumes: the
//! per-stage [`StageResult`], the canonical [`FixRecord`], heuristic
//! [`Finding`]s and the shared [`Severity`] scale.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Severity
// ============================================================================

/// Severity scale shared by fixes, findings and risk levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }

    /// Case-insensitive parse. Unknown labels map to `default`.
    pub fn parse_or(value: &str, default: Severity) -> Severity {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            "low" => Severity::Low,
            "info" | "informational" => Severity::Info,
            _ => default,
        }
    }

    /// Risk bucket for a 0-100 score: <25 LOW, <50 MEDIUM, <75 HIGH, else CRITICAL.
    pub fn from_risk_score(score: u32) -> Severity {
        match score {
            0..=24 => Severity::Low,
            25..=49 => Severity::Medium,
            50..=74 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Stage & Mode
// ============================================================================

/// Nodes of the pipeline DAG, declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Classifier,
    Planner,
    Generator,
    Validator,
    Tester,
    Security,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::Classifier,
        StageKind::Planner,
        StageKind::Generator,
        StageKind::Validator,
        StageKind::Tester,
        StageKind::Security,
    ];

    /// Inverse of [`StageKind::agent_name`].
    pub fn from_agent_name(name: &str) -> Option<StageKind> {
        Self::ALL.into_iter().find(|s| s.agent_name() == name)
    }

    /// Agent label used on fix records and activity events.
    pub fn agent_name(&self) -> &'static str {
        match self {
            StageKind::Classifier => "classifier",
            StageKind::Planner => "planner",
            StageKind::Generator => "code_generator",
            StageKind::Validator => "validator",
            StageKind::Tester => "testing",
            StageKind::Security => "security",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StageKind::Classifier => "Classifier",
            StageKind::Planner => "Project Planner",
            StageKind::Generator => "Code Generator",
            StageKind::Validator => "Code Validator",
            StageKind::Tester => "Testing Agent",
            StageKind::Security => "Security Scanner",
        }
    }

    /// Stages that may rewrite the artifact.
    pub fn is_analysis(&self) -> bool {
        matches!(
            self,
            StageKind::Validator | StageKind::Tester | StageKind::Security
        )
    }

    /// Category stamped on fixes that arrive without one.
    pub fn default_fix_category(&self) -> &'static str {
        match self {
            StageKind::Tester => "Error Handling",
            StageKind::Security => "Security",
            _ => "Code Quality",
        }
    }

    /// Severity stamped on fixes that arrive without one.
    pub fn default_fix_severity(&self) -> Severity {
        match self {
            StageKind::Security => Severity::High,
            _ => Severity::Medium,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.agent_name())
    }
}

/// Scope decided by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    #[default]
    Single,
    Multi,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Single => "single",
            PipelineMode::Multi => "multi",
        }
    }
}

// ============================================================================
// Fix Record & Finding
// ============================================================================

/// One attributable change a stage applied to the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRecord {
    pub agent: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl FixRecord {
    pub fn new(stage: StageKind, description: impl Into<String>) -> Self {
        Self {
            agent: stage.agent_name().to_string(),
            description: description.into(),
            severity: stage.default_fix_severity(),
            before: None,
            after: None,
            line: None,
            category: Some(stage.default_fix_category().to_string()),
        }
    }
}

/// A problem a stage detected (vulnerability, lint issue, missing test).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Vulnerability class or issue kind, e.g. "Code Injection"
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

// ============================================================================
// Stage Result
// ============================================================================

/// Parsed or heuristic output of one stage agent.
///
/// `fixed_code`, when present, always holds the complete artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage: StageKind,
    /// Stage-specific tag: "passed"/"warnings"/"failed", "secure"/"vulnerabilities_found", ...
    pub status: String,
    /// Quality or coverage score (0-100) when the stage reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<Severity>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub fixes: Vec<FixRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_code: Option<String>,
    pub ai_powered: bool,
    /// Set when the stage fell back, failed mid-stream, or crashed.
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Any other keys the model returned (stats, test_cases, recommendations, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl StageResult {
    pub fn new(stage: StageKind, status: impl Into<String>) -> Self {
        Self {
            stage,
            status: status.into(),
            score: None,
            risk_level: None,
            issues: Vec::new(),
            findings: Vec::new(),
            fixes: Vec::new(),
            fixed_code: None,
            ai_powered: false,
            degraded: false,
            message: String::new(),
            warnings: Vec::new(),
            details: Map::new(),
        }
    }

    /// Result for a stage that could not produce anything usable.
    pub fn degraded(stage: StageKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut result = Self::new(stage, "degraded");
        result.degraded = true;
        result.message = format!("{} degraded: {}", stage.display_name(), reason);
        result.warnings.push(reason);
        result
    }

    /// True when the stage claims a complete replacement artifact.
    pub fn has_changes(&self) -> bool {
        self.fixed_code
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
            && !self.fixes.is_empty()
    }

    /// Drop a rejected replacement and record why.
    pub fn discard_fix(&mut self, warning: impl Into<String>) {
        self.fixed_code = None;
        self.fixes.clear();
        self.warnings.push(warning.into());
    }
}
