//! Response Normalization
//!
//! Models return fixes as plain strings or as objects, line numbers as
//! numbers or strings, scores as floats. Everything is coerced here into the
//! canonical types so nothing downstream branches on shape.

use serde_json::{Map, Value};

use crate::prompts::FIXED_CODE_PLACEHOLDERS;
use uber_codegen_core::{Finding, FixRecord, Severity, StageKind};
use uber_codegen_interpreter::{strip_markdown_fences, JsonMap};

/// Canonical fix records from a `fixes_applied` value.
///
/// Strings become description-only fixes; objects keep their fields. Missing
/// severity and category fall back to the stage defaults. Entries with no
/// usable description are dropped.
pub fn fix_records(stage: StageKind, value: Option<&Value>) -> Vec<FixRecord> {
    items(value)
        .filter_map(|item| match item {
            Value::String(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| FixRecord::new(stage, text))
            }
            Value::Object(obj) => fix_from_object(stage, obj),
            Value::Null => None,
            other => Some(FixRecord::new(stage, other.to_string())),
        })
        .collect()
}

fn fix_from_object(stage: StageKind, obj: &Map<String, Value>) -> Option<FixRecord> {
    let description = text_field(obj, "description")
        .or_else(|| text_field(obj, "fix"))
        .or_else(|| text_field(obj, "issue"))?;

    let mut fix = FixRecord::new(stage, description);
    if let Some(severity) = text_field(obj, "severity") {
        fix.severity = Severity::parse_or(&severity, stage.default_fix_severity());
    }
    fix.before = snippet_field(obj, "before");
    fix.after = snippet_field(obj, "after");
    fix.line = obj.get("line").and_then(line_number);
    if let Some(category) = text_field(obj, "category") {
        fix.category = Some(category);
    }
    Some(fix)
}

/// Findings from a `vulnerabilities` (or issue) list.
pub fn findings(stage: StageKind, value: Option<&Value>) -> Vec<Finding> {
    items(value)
        .filter_map(|item| match item {
            Value::String(text) if !text.trim().is_empty() => Some(Finding {
                kind: "Issue".to_string(),
                severity: stage.default_fix_severity(),
                description: text.trim().to_string(),
                pattern: None,
                line: None,
            }),
            Value::Object(obj) => {
                let description = text_field(obj, "description")
                    .or_else(|| text_field(obj, "pattern"))?;
                Some(Finding {
                    kind: text_field(obj, "type")
                        .or_else(|| text_field(obj, "kind"))
                        .unwrap_or_else(|| "Issue".to_string()),
                    severity: text_field(obj, "severity")
                        .map(|s| Severity::parse_or(&s, stage.default_fix_severity()))
                        .unwrap_or_else(|| stage.default_fix_severity()),
                    description,
                    pattern: text_field(obj, "pattern"),
                    line: obj.get("line").and_then(line_number),
                })
            }
            _ => None,
        })
        .collect()
}

/// A list of human-readable strings. Objects contribute their description.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    items(value)
        .filter_map(|item| match item {
            Value::String(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Value::Object(obj) => text_field(obj, "description")
                .or_else(|| text_field(obj, "test_name"))
                .or_else(|| Some(Value::Object(obj.clone()).to_string())),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

/// Replacement artifact, or `None` when blank or a template placeholder.
pub fn fixed_code(value: Option<&Value>) -> Option<String> {
    let code = value?.as_str()?;
    let trimmed = code.trim();
    if trimmed.is_empty() || FIXED_CODE_PLACEHOLDERS.contains(&trimmed) {
        return None;
    }
    Some(strip_markdown_fences(code))
}

/// A 0-100 score from a number or numeric string.
pub fn score(value: Option<&Value>) -> Option<u32> {
    let raw = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u32)
}

/// A 1-based line number from a number, a numeric string, or "line 12".
pub fn line_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
    .filter(|n| *n > 0)
}

/// Text value of a field, trimmed and non-empty.
pub fn text(map: &JsonMap, key: &str) -> Option<String> {
    text_field(map, key)
}

/// Keys of `map` not in `known`, for the result's free-form details.
pub fn remaining(map: &JsonMap, known: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn items(value: Option<&Value>) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(Value::Null) | None => Box::new(std::iter::empty()),
        Some(single) => Box::new(std::iter::once(single)),
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn snippet_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null => None,
        Value::String(_) => None,
        other => Some(other.to_string()),
    }
}
