//! Markdown fence stripping for generated source.

/// Remove a leading ```` ```lang ```` line and a trailing ```` ``` ```` line.
///
/// Only the outermost fence pair is touched; fences inside the body stay.
pub fn strip_markdown_fences(code: &str) -> String {
    let mut lines: Vec<&str> = code.split('\n').collect();

    let opens_with_fence = lines.first().is_some_and(|first| {
        let first = first.trim();
        first.starts_with("```")
            && first[3..]
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '+' || c == '-')
    });
    if opens_with_fence {
        lines.remove(0);
    }

    while lines.last().is_some_and(|l| l.trim().is_empty()) && opens_with_fence {
        lines.pop();
    }
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }

    lines.join("\n")
}
