//! Replacement Guards
//!
//! Checks a stage's replacement artifact must pass before it is accepted:
//! file markers must survive unchanged and delimiters must stay balanced.

use uber_codegen_core::artifact::{file_markers, split_files};
use uber_codegen_core::{detect_language, is_executable_source};

/// Which line-comment syntax to honour while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `#`
    Hash,
    /// `//` and `/* */`
    Slash,
}

pub fn style_for_language(language: &str) -> Option<CommentStyle> {
    match language {
        "python" | "ruby" | "bash" | "shell" | "yaml" | "toml" | "dockerfile" => {
            Some(CommentStyle::Hash)
        }
        "javascript" | "typescript" | "java" | "go" | "rust" | "c" | "cpp" | "csharp"
        | "php" | "css" | "kotlin" | "swift" => Some(CommentStyle::Slash),
        _ => None,
    }
}

/// Guess the comment style of an unlabelled snippet.
pub fn guess_style(code: &str) -> CommentStyle {
    let mut hash = 0usize;
    let mut slash = 0usize;
    for line in code.lines().map(str::trim) {
        if line.starts_with("def ") || line.starts_with("elif ") || line.starts_with('#') {
            hash += 1;
        }
        if line.ends_with('{') || line.ends_with(';') || line.starts_with("//") {
            slash += 1;
        }
    }
    if hash > slash {
        CommentStyle::Hash
    } else {
        CommentStyle::Slash
    }
}

/// True when every `()`, `[]` and `{}` outside strings and comments closes in order.
pub fn is_balanced(code: &str, style: CommentStyle) -> bool {
    let chars: Vec<char> = code.chars().collect();
    let mut stack: Vec<char> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '#' if style == CommentStyle::Hash => i = skip_line(&chars, i),
            '/' if style == CommentStyle::Slash && next == Some('/') => i = skip_line(&chars, i),
            '/' if style == CommentStyle::Slash && next == Some('*') => {
                match find(&chars, i + 2, &['*', '/']) {
                    Some(end) => i = end + 2,
                    None => return false,
                }
            }
            '"' | '\'' if chars[i..].starts_with(&[c, c, c]) => {
                match find(&chars, i + 3, &[c, c, c]) {
                    Some(end) => i = end + 3,
                    None => return false,
                }
            }
            '"' | '\'' | '`' => i = skip_string(&chars, i, c),
            '(' | '[' | '{' => {
                stack.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    return false;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    stack.is_empty()
}

/// Balanced check for a whole artifact text. Bundles are checked per
/// executable file, with the style taken from each file's language.
pub fn artifact_is_balanced(text: &str) -> bool {
    if file_markers(text).is_empty() {
        return is_balanced(text, guess_style(text));
    }
    split_files(text)
        .iter()
        .filter(|(path, _)| is_executable_source(path))
        .all(|(path, content)| {
            let style = style_for_language(detect_language(path))
                .unwrap_or_else(|| guess_style(content));
            is_balanced(content, style)
        })
}

fn skip_line(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(chars.len(), |offset| start + offset)
}

/// Index just past the closing quote. Single-line quotes end at a newline.
fn skip_string(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' if quote != '`' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn find(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if from > chars.len() {
        return None;
    }
    chars[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|offset| from + offset)
}
