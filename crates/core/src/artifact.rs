//! Code Artifacts
//!
//! The evolving code a pipeline run threads through its stages, plus the
//! marker format used to hand several files to a model as one text:
//!
//! ```text
//! <!-- app/main.py -->
//! print("hi")
//!
//! <!-- app/utils.py -->
//! def helper(): ...
//! ```
//!
//! A marker line is an HTML comment whose body is a single path-like token
//! (no whitespace, contains `.` or `/`). Ordinary comments such as
//! `<!-- Header -->` are not markers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Ordered path -> content map. Insertion order is plan order.
pub type FileBundle = IndexMap<String, String>;

/// Single-file source text or a multi-file bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeArtifact {
    Single(String),
    Multi(FileBundle),
}

impl Default for CodeArtifact {
    fn default() -> Self {
        CodeArtifact::Single(String::new())
    }
}

impl CodeArtifact {
    pub fn is_empty(&self) -> bool {
        match self {
            CodeArtifact::Single(code) => code.trim().is_empty(),
            CodeArtifact::Multi(files) => files.values().all(|c| c.trim().is_empty()),
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            CodeArtifact::Single(code) => code.lines().count(),
            CodeArtifact::Multi(files) => files.values().map(|c| c.lines().count()).sum(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            CodeArtifact::Single(code) => Some(code),
            CodeArtifact::Multi(_) => None,
        }
    }

    pub fn files(&self) -> Option<&FileBundle> {
        match self {
            CodeArtifact::Multi(files) => Some(files),
            CodeArtifact::Single(_) => None,
        }
    }
}

/// Render the separator line for `path`.
pub fn marker_line(path: &str) -> String {
    format!("<!-- {} -->", path)
}

/// True when `marker_line(path)` parses back to `path`.
pub fn is_marker_path(path: &str) -> bool {
    !path.is_empty()
        && !path.contains(char::is_whitespace)
        && !path.contains("-->")
        && (path.contains('.') || path.contains('/'))
}

/// Return the path if `line` is a file marker.
pub fn parse_marker(line: &str) -> Option<&str> {
    let inner = line
        .trim()
        .strip_prefix("<!--")?
        .strip_suffix("-->")?
        .trim();
    is_marker_path(inner).then_some(inner)
}

/// Marker paths in order of appearance.
pub fn file_markers(code: &str) -> Vec<String> {
    code.lines()
        .filter_map(parse_marker)
        .map(str::to_string)
        .collect()
}

/// True when both texts carry the same marker paths in the same order.
pub fn markers_match(before: &str, after: &str) -> bool {
    file_markers(before) == file_markers(after)
}

/// Concatenate files into one marker-separated text.
pub fn join_files<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut out = String::new();
    for (path, content) in files {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&marker_line(path));
        out.push('\n');
        out.push_str(content.trim_end());
        out.push('\n');
    }
    out
}

/// Split a marker-separated text back into `(path, content)` pairs.
///
/// Text before the first marker is dropped. Trailing blank lines of each
/// section are removed.
pub fn split_files(bundle: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    for line in bundle.lines() {
        if let Some(path) = parse_marker(line) {
            sections.push((path.to_string(), Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }
    sections
        .into_iter()
        .map(|(path, body)| {
            let content = body.join("\n").trim_end().to_string();
            (path, content)
        })
        .collect()
}

/// Apply a rewritten bundle onto `original`.
///
/// Every path in `bundle` must already exist in `original`, in the same order
/// as the subset it was built from. Files whose content only differs in
/// trailing whitespace keep their original bytes. A section that still holds
/// another file's separator line is rejected rather than folded in.
pub fn merge_bundle(original: &FileBundle, bundle: &str) -> CoreResult<FileBundle> {
    let mut merged = original.clone();
    for (path, content) in split_files(bundle) {
        if let Some(stray) = content
            .lines()
            .map(str::trim)
            .find(|line| original.keys().any(|p| *line == marker_line(p)))
        {
            return Err(CoreError::artifact(format!(
                "section '{}' contains separator '{}'",
                path, stray
            )));
        }
        let slot = merged
            .get_mut(&path)
            .ok_or_else(|| CoreError::artifact(format!("unknown file marker '{}'", path)))?;
        if slot.trim_end() == content.trim_end() {
            continue;
        }
        let mut replacement = content;
        if slot.ends_with('\n') {
            replacement.push('\n');
        }
        *slot = replacement;
    }
    Ok(merged)
}
