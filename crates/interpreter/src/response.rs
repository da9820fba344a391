//! Response Interpreter
//!
//! Recovers a JSON object from model text that was asked to be JSON but may be
//! wrapped in prose, fenced, truncated, or carry unescaped text.
//!
//! Strategies run in order and stop at the first success. Each one reads the
//! original text:
//!
//! 1. `BraceSpan` - parse the slice from the first `{` to the last `}`
//! 2. `Unwrapped` - look inside code fences, then scan for the first complete
//!    object embedded in prose
//! 3. `Repaired` - drop the free-text `report` field and escape raw control
//!    characters inside string literals, then parse the brace span
//! 4. `FieldExtraction` - pull `status`, `fixed_code`, `fixes_applied` and
//!    `issues` out one by one; only useful when `status` or `fixed_code` survives

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

pub type JsonMap = Map<String, Value>;

/// Which strategy produced the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BraceSpan,
    Unwrapped,
    Repaired,
    FieldExtraction,
}

/// Upper bound on `{` positions tried when scanning prose.
const MAX_SCAN_CANDIDATES: usize = 64;

/// Parse model text into a JSON object, or `None` when nothing useful survives.
pub fn parse(raw: Option<&str>) -> Option<JsonMap> {
    parse_with_strategy(raw).map(|(map, _)| map)
}

/// Like [`parse`], also reporting which strategy succeeded.
pub fn parse_with_strategy(raw: Option<&str>) -> Option<(JsonMap, Strategy)> {
    let text = raw?;
    if text.trim().is_empty() {
        return None;
    }

    let attempts: [(Strategy, fn(&str) -> Option<JsonMap>); 4] = [
        (Strategy::BraceSpan, brace_span),
        (Strategy::Unwrapped, unwrapped),
        (Strategy::Repaired, repaired),
        (Strategy::FieldExtraction, extract_fields),
    ];

    for (strategy, attempt) in attempts {
        if let Some(map) = attempt(text) {
            debug!("[Interpreter] recovered JSON via {:?}", strategy);
            return Some((map, strategy));
        }
    }

    debug!("[Interpreter] no strategy recovered a mapping ({} chars)", text.len());
    None
}

fn object_from(candidate: &str) -> Option<JsonMap> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// ============================================================================
// Pass 1: brace span
// ============================================================================

fn brace_span(text: &str) -> Option<JsonMap> {
    object_from(brace_slice(text)?)
}

// ============================================================================
// Pass 2: fences and prose
// ============================================================================

fn unwrapped(text: &str) -> Option<JsonMap> {
    for block in fenced_blocks(text) {
        if let Some(map) = brace_span(block).or_else(|| first_embedded_object(block)) {
            return Some(map);
        }
    }

    let unfenced = text
        .replace("```json", "")
        .replace("```python", "")
        .replace("```", "");
    brace_span(&unfenced).or_else(|| first_embedded_object(&unfenced))
}

/// Bodies of ```-fenced blocks, language tag line excluded.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut remaining = text;
    while let Some(start) = remaining.find("```") {
        let after_marker = &remaining[start + 3..];
        let body_start = after_marker.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_marker[body_start..];
        match body.find("```") {
            Some(end) => {
                blocks.push(&body[..end]);
                remaining = &body[end + 3..];
            }
            None => {
                blocks.push(body);
                break;
            }
        }
    }
    blocks
}

/// Byte offsets of `{` that open a top-level brace group.
///
/// Quotes only count inside a group, so prose apostrophes and quotes do not
/// confuse the depth.
fn top_level_openings(text: &str) -> Vec<usize> {
    scan_openings(text, |_| true)
}

/// Like [`top_level_openings`], but a `{` only opens a group when it reads
/// like the start of an object (`{"` or `{}`). A stray brace in prose then
/// no longer hides the object after it.
fn object_openings(text: &str) -> Vec<usize> {
    scan_openings(text, |rest| {
        matches!(rest.trim_start().chars().next(), Some('"') | Some('}'))
    })
}

fn scan_openings(text: &str, opens: impl Fn(&str) -> bool) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' if depth > 0 => depth += 1,
            '{' if opens(&text[i + 1..]) => {
                positions.push(i);
                depth = 1;
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    positions
}

/// First non-empty object that parses completely.
///
/// Top-level groups are tried first, then groups that look like objects
/// once stray prose braces are ignored.
fn first_embedded_object(text: &str) -> Option<JsonMap> {
    let top_level = top_level_openings(text);
    object_at_any(text, top_level.iter().copied()).or_else(|| {
        let rest = object_openings(text)
            .into_iter()
            .filter(|i| !top_level.contains(i));
        object_at_any(text, rest)
    })
}

fn object_at_any(text: &str, starts: impl Iterator<Item = usize>) -> Option<JsonMap> {
    starts.take(MAX_SCAN_CANDIDATES).find_map(|i| {
        let mut values = serde_json::Deserializer::from_str(&text[i..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(map))) if !map.is_empty() => Some(map),
            _ => None,
        }
    })
}

// ============================================================================
// Pass 3: repair
// ============================================================================

fn report_patterns() -> Option<&'static (Regex, Regex)> {
    static PATTERNS: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            let trailing = Regex::new(r#",\s*"report"\s*:\s*"[^"]*(?:\\.[^"]*)*""#).ok()?;
            let leading = Regex::new(r#""report"\s*:\s*"[^"]*(?:\\.[^"]*)*"\s*,?"#).ok()?;
            Some((trailing, leading))
        })
        .as_ref()
}

fn without_report_field(json: &str) -> String {
    match report_patterns() {
        Some((trailing, leading)) => {
            let once = trailing.replace_all(json, "");
            leading.replace_all(&once, "").into_owned()
        }
        None => json.to_string(),
    }
}

/// Escape raw control characters that appear inside string literals.
fn escape_control_chars(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

fn repaired(text: &str) -> Option<JsonMap> {
    let span = brace_slice(text)?;
    let without_report = without_report_field(span);
    object_from(&without_report)
        .or_else(|| object_from(&escape_control_chars(&without_report)))
        .or_else(|| object_from(&escape_control_chars(span)))
}

// ============================================================================
// Pass 4: field extraction
// ============================================================================

struct FieldPatterns {
    status: Regex,
    fixed_code: Regex,
    fixes_applied: Regex,
    issues: Regex,
    quoted: Regex,
    description: Regex,
}

fn field_patterns() -> Option<&'static FieldPatterns> {
    static PATTERNS: OnceLock<Option<FieldPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(FieldPatterns {
                status: Regex::new(r#""status"\s*:\s*"([^"]+)""#).ok()?,
                fixed_code: Regex::new(r#"(?s)"fixed_code"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok()?,
                fixes_applied: Regex::new(r#"(?s)"fixes_applied"\s*:\s*\[(.*?)\]"#).ok()?,
                issues: Regex::new(r#"(?s)"issues"\s*:\s*\[(.*?)\]"#).ok()?,
                quoted: Regex::new(r#""((?:[^"\\]|\\.)+)""#).ok()?,
                description: Regex::new(r#""description"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok()?,
            })
        })
        .as_ref()
}

/// Decode JSON string escapes, tolerating raw newlines and bad sequences.
fn unescape(raw: &str) -> String {
    if let Ok(s) = serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        return s;
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn string_list(patterns: &FieldPatterns, array_body: &str) -> Vec<Value> {
    let source = if array_body.contains('{') {
        &patterns.description
    } else {
        &patterns.quoted
    };
    source
        .captures_iter(array_body)
        .filter_map(|c| c.get(1))
        .map(|m| Value::String(unescape(m.as_str())))
        .collect()
}

fn extract_fields(text: &str) -> Option<JsonMap> {
    let patterns = field_patterns()?;
    let mut extracted = JsonMap::new();

    if let Some(m) = patterns.status.captures(text).and_then(|c| c.get(1)) {
        extracted.insert("status".into(), Value::String(m.as_str().to_string()));
    }
    if let Some(m) = patterns.fixed_code.captures(text).and_then(|c| c.get(1)) {
        extracted.insert("fixed_code".into(), Value::String(unescape(m.as_str())));
    }
    if !extracted.contains_key("status") && !extracted.contains_key("fixed_code") {
        return None;
    }
    if let Some(m) = patterns.fixes_applied.captures(text).and_then(|c| c.get(1)) {
        extracted.insert(
            "fixes_applied".into(),
            Value::Array(string_list(patterns, m.as_str())),
        );
    }
    if let Some(m) = patterns.issues.captures(text).and_then(|c| c.get(1)) {
        extracted.insert("issues".into(), Value::Array(string_list(patterns, m.as_str())));
    }
    Some(extracted)
}
