//! Project Plans
//!
//! A multi-file run first produces a [`ProjectPlan`]: an ordered list of
//! [`FileSpec`]s. Order is generation order, so later files may import
//! earlier ones.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One file the planner asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub language: String,
}

impl FileSpec {
    /// Build a spec, detecting the language from the extension when `language` is empty.
    pub fn new(path: impl Into<String>, purpose: impl Into<String>, language: &str) -> Self {
        let path = path.into();
        let language = if language.trim().is_empty() {
            detect_language(&path).to_string()
        } else {
            language.trim().to_string()
        };
        Self {
            path,
            purpose: purpose.into(),
            language,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    pub files: Vec<FileSpec>,
}

impl ProjectPlan {
    /// Build a plan keeping only the first occurrence of each path.
    pub fn new(
        project_name: impl Into<String>,
        description: impl Into<String>,
        files: Vec<FileSpec>,
    ) -> Self {
        let mut seen = HashSet::new();
        let files = files
            .into_iter()
            .filter(|f| !f.path.trim().is_empty() && seen.insert(f.path.clone()))
            .collect();
        Self {
            project_name: project_name.into(),
            description: description.into(),
            files,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }
}

const LANGUAGE_BY_EXTENSION: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".mjs", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".html", "html"),
    (".css", "css"),
    (".scss", "scss"),
    (".json", "json"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".md", "markdown"),
    (".txt", "text"),
    (".sql", "sql"),
    (".sh", "bash"),
    (".bat", "batch"),
    (".env", "text"),
    (".toml", "toml"),
    (".cfg", "ini"),
    (".dockerfile", "dockerfile"),
    (".go", "go"),
    (".rs", "rust"),
    (".java", "java"),
    (".rb", "ruby"),
    (".php", "php"),
];

/// Extensions whose files go through validate/test/secure.
const EXECUTABLE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".jsx", ".mjs", ".ts", ".tsx", ".go", ".rs", ".java", ".rb", ".php",
];

/// Language tag for a path, `"text"` when unknown.
pub fn detect_language(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if let Some((_, lang)) = LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
    {
        return lang;
    }
    if lower == "dockerfile" || lower.ends_with("/dockerfile") {
        return "dockerfile";
    }
    "text"
}

/// True for source files (not markup, config or docs).
pub fn is_executable_source(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    EXECUTABLE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
