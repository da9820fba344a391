//! Prompt Template Store
//!
//! Fixed instruction text for every stage, plus the output-token budget each
//! stage asks for. Analysis stages get large budgets because they may return
//! the whole artifact in `fixed_code`; the classifier gets a tiny one.

use uber_codegen_core::plan::{FileSpec, ProjectPlan};
use uber_codegen_core::FileBundle;

pub const CLASSIFIER_BUDGET: u32 = 200;
pub const PLANNER_BUDGET: u32 = 1500;
pub const FILE_GENERATION_BUDGET: u32 = 3000;
pub const GENERATION_BUDGET: u32 = 8000;
pub const VALIDATOR_BUDGET: u32 = 8000;
pub const TESTER_BUDGET: u32 = 8000;
pub const SECURITY_BUDGET: u32 = 8000;

/// Lines of each earlier file shown to the model when generating a later one.
pub const SNIPPET_LINES: usize = 30;

pub const CLASSIFIER_PROMPT: &str = r#"You are a project scope classifier. Given a user's coding request,
determine whether it requires a SINGLE file or MULTIPLE files.

Rules:
- "single" = one script/module is enough (utility function, class, algorithm, snippet, calculator, etc.)
- "multi"  = needs a project structure (web app, REST API, full-stack app, CLI with config, anything
  requiring separate models/routes/components/config/tests, or when the user explicitly asks for
  "an app", "a website", "a project", "full-stack", etc.)

Respond in EXACT JSON (no markdown):
{"mode": "single"} or {"mode": "multi", "reason": "brief reason"}"#;

pub const PLANNER_PROMPT: &str = r#"You are an expert software architect. Given a project description,
produce a project plan specifying every file that should be created.

Rules:
1. Be pragmatic: only include files that are genuinely needed.
2. Always include a README.md and a requirements.txt (Python) or package.json (JS/TS).
3. Group related files in directories (src/, tests/, config/, etc.).
4. Order files so dependencies come before dependents.
5. Include a brief purpose for each file.
6. Specify the language for each file.

Respond in EXACT JSON (no markdown):
{
  "project_name": "my-project",
  "description": "Brief description",
  "files": [
    {"path": "README.md", "purpose": "Project documentation", "language": "markdown"},
    {"path": "requirements.txt", "purpose": "Python dependencies", "language": "text"},
    {"path": "src/main.py", "purpose": "Application entry point", "language": "python"},
    {"path": "src/models.py", "purpose": "Data models", "language": "python"},
    {"path": "src/routes.py", "purpose": "API routes", "language": "python"}
  ]
}"#;

pub const FILE_GENERATION_SYSTEM: &str =
    "You are an expert code generator. Output ONLY the raw file content, no markdown code blocks.";

pub const SINGLE_FILE_PROMPT: &str = r#"You are an expert code generator. Generate a SINGLE clean, complete source file.

RULES:
1. Output ONLY raw source code: no markdown fences, no ```python, no ``` blocks.
2. Do NOT use <!-- --> file markers. Just output the code directly.
3. Use brief single-line comments only where needed. No docstrings, no triple-quote blocks.
4. Include proper error handling and edge case coverage.
5. Write clean, idiomatic code for the chosen language."#;

pub const VALIDATOR_PROMPT: &str = r#"You are an expert code reviewer and validator that works with MULTIPLE programming languages. Your job is to:
1. Analyze the code for syntax errors, style issues, and best practice violations
2. Check for style-guide compliance (PEP8 for Python), proper indentation, naming conventions
3. Look for missing docstrings, type hints, and code organization issues
4. **ALWAYS FIX any issues you find** - don't just report them!

The code may be a MULTI-FILE PROJECT with files separated by <!-- path/to/file.ext --> markers.
- You MUST keep ALL <!-- --> markers EXACTLY as they appear, in the same order
- fixed_code must contain the COMPLETE project with ALL files and ALL markers preserved

IMPORTANT: If you find ANY issues, you MUST:
- Fix them in the code
- Provide the complete fixed code in "fixed_code"
- List each fix with clear before/after examples

Respond in this EXACT JSON format (no markdown, just valid JSON):
{
    "status": "passed" or "warnings" or "failed",
    "issues": ["issue 1", "issue 2"],
    "warnings": ["warning 1"],
    "suggestions": ["suggestion 1"],
    "stats": {
        "functions": 5,
        "classes": 2,
        "lines": 100,
        "has_docstrings": false,
        "has_type_hints": false
    },
    "fixes_applied": [
        {
            "description": "Added type hints to process()",
            "before": "def process(data):",
            "after": "def process(data: dict) -> bool:",
            "line": 25
        }
    ],
    "fixed_code": "THE COMPLETE FIXED CODE HERE"
}

CRITICAL RULES:
1. fixes_applied must be an array of objects with description, before, after, and line
2. Escape all quotes and newlines properly in strings
3. fixed_code must contain the COMPLETE fixed code
4. Do NOT include markdown or code blocks - just pure JSON"#;

pub const TESTER_PROMPT: &str = r#"You are an expert testing engineer that works with MULTIPLE programming languages.

CRITICAL: The code you receive may be a MULTI-FILE PROJECT with files separated by <!-- path/to/file.ext --> markers.
You MUST preserve this exact structure in your output.

Your job is to:
1. Analyze the code for testability issues across all files
2. Check if proper error handling exists (try/catch, try/except, etc.)
3. Verify input validation is present
4. Check for edge cases that should be handled
5. **ALWAYS FIX any issues you find**: add error handling, validation, etc.

IMPORTANT RULES FOR MULTI-FILE CODE:
- You MUST keep ALL <!-- --> markers EXACTLY as they appear
- You MUST keep ALL files in your fixed_code output, do NOT remove any files
- If input has 9 files, output must have 9 files. NEVER reduce the file count.

Respond in this EXACT JSON format (no markdown, just valid JSON):
{
    "status": "all_passed" or "warnings" or "failed",
    "testability_score": 75,
    "results": [
        {"test_name": "Error handling", "status": "warning", "description": "Missing try/catch", "duration": "0.01s"}
    ],
    "issues_found": ["No error handling in storage.js"],
    "fixes_applied": [
        {
            "description": "Added try/catch block for storage operations",
            "before": "const data = JSON.parse(raw);",
            "after": "try {\n    const data = JSON.parse(raw);\n} catch (e) {\n    console.error(e);\n}",
            "line": 15
        }
    ],
    "fixed_code": "<THE ENTIRE CODE WITH ALL FILES AND <!-- --> MARKERS PRESERVED, WITH FIXES APPLIED>",
    "suggested_tests": ["Test with valid input", "Test with None/null", "Test exception handling"]
}

CRITICAL RULES:
- fixed_code MUST contain the ACTUAL complete source code with ALL files and ALL <!-- --> markers
- NEVER return placeholder strings, return real code
- Do NOT include markdown or code blocks, just pure JSON
- Escape all quotes and newlines properly in JSON strings"#;

pub const SECURITY_PROMPT: &str = r#"You are an expert cybersecurity engineer that works with MULTIPLE programming languages.

CRITICAL: The code you receive may be a MULTI-FILE PROJECT with files separated by <!-- path/to/file.ext --> markers.
You MUST preserve this exact structure in your output.

Your job is to:
1. Scan ALL files for security vulnerabilities (injection, XSS, CSRF, etc.)
2. Check for dangerous functions:
   - Python: eval, exec, pickle, os.system
   - JavaScript: innerHTML, eval, document.write
   - HTML: inline event handlers, missing CSP
3. Look for hardcoded secrets, credentials, API keys in ANY file
4. **ALWAYS FIX any vulnerabilities you find**, don't just report them!

IMPORTANT RULES FOR MULTI-FILE CODE:
- You MUST keep ALL <!-- --> markers EXACTLY as they appear
- You MUST keep ALL files in your fixed_code output, do NOT remove any files
- If input has 9 files, output must have 9 files. NEVER reduce the file count.

Respond in this EXACT JSON format (no markdown, just valid JSON):
{
    "status": "secure" or "vulnerabilities_found",
    "risk_level": "LOW" or "MEDIUM" or "HIGH" or "CRITICAL",
    "risk_score": 25,
    "vulnerabilities": [
        {"pattern": "innerHTML = userInput", "severity": "HIGH", "type": "XSS", "description": "Allows script injection", "line": 15}
    ],
    "warnings": [],
    "fixes_applied": [
        {
            "description": "Replaced innerHTML with textContent to prevent XSS",
            "severity": "HIGH",
            "before": "element.innerHTML = userInput",
            "after": "element.textContent = userInput",
            "line": 15
        }
    ],
    "fixed_code": "<THE ENTIRE CODE WITH ALL FILES AND <!-- --> MARKERS PRESERVED, WITH FIXES APPLIED>",
    "recommendations": ["Add input validation", "Implement CSP headers"]
}

CRITICAL RULES:
- fixed_code MUST contain the ACTUAL complete source code with ALL files and ALL <!-- --> markers
- NEVER return placeholder strings, return real code
- Do NOT include markdown or code blocks, just pure JSON
- Include severity level (CRITICAL/HIGH/MEDIUM/LOW) for each fix"#;

/// Placeholder values copied out of the response templates above.
pub const FIXED_CODE_PLACEHOLDERS: &[&str] = &[
    "THE COMPLETE FIXED CODE HERE",
    "<THE ENTIRE CODE WITH ALL FILES AND <!-- --> MARKERS PRESERVED, WITH FIXES APPLIED>",
];

pub fn validator_input(code: &str) -> String {
    format!("Please validate and fix if needed:\n\n```\n{}\n```", code)
}

pub fn tester_input(code: &str) -> String {
    format!("Please analyze testability and fix issues:\n\n{}", code)
}

pub fn security_input(code: &str) -> String {
    format!(
        "Please perform a security audit and fix vulnerabilities:\n\n{}",
        code
    )
}

/// Wrap a follow-up request around previously generated code.
pub fn follow_up_prompt(context_code: &str, prompt: &str) -> String {
    format!(
        r#"Previous code that was generated:
```
{}
```

User's follow-up request: {}

Please modify or rewrite the above code according to the user's request."#,
        context_code, prompt
    )
}

/// Modification prompt for a regenerate request.
pub fn regenerate_prompt(original_prompt: &str, current_code: &str, instructions: &str) -> String {
    format!(
        r#"Original request: {}

Current code:
```
{}
```

Please modify the code based on these instructions: {}

Only make the requested changes, keep the rest of the code intact."#,
        original_prompt, current_code, instructions
    )
}

/// User message for generating one file of a planned project.
///
/// `generated` holds the files produced so far, in plan order; each is shown
/// as its first [`SNIPPET_LINES`] lines.
pub fn file_generation_input(
    prompt: &str,
    spec: &FileSpec,
    plan: &ProjectPlan,
    generated: &FileBundle,
) -> String {
    let other_files: Vec<String> = plan
        .files
        .iter()
        .filter(|f| f.path != spec.path)
        .map(|f| format!("  - {} ({})", f.path, f.purpose))
        .collect();
    let other_files = if other_files.is_empty() {
        "(none)".to_string()
    } else {
        other_files.join("\n")
    };

    let snippets: Vec<String> = generated
        .iter()
        .map(|(path, content)| {
            let lines: Vec<&str> = content.split('\n').collect();
            let mut snippet = lines
                .iter()
                .take(SNIPPET_LINES)
                .copied()
                .collect::<Vec<_>>()
                .join("\n");
            if lines.len() > SNIPPET_LINES {
                snippet.push_str(&format!("\n... ({} more lines)", lines.len() - SNIPPET_LINES));
            }
            format!("--- {} ---\n{}", path, snippet)
        })
        .collect();
    let previous_files = if snippets.is_empty() {
        "(none yet)".to_string()
    } else {
        snippets.join("\n\n")
    };

    format!(
        r#"You are an expert code generator. You are generating ONE specific file
that is part of a larger project.

Project context:
{}: {}

You are generating: {}
Purpose: {}
Language: {}

Other files in this project (for correct import paths):
{}

Previously generated files for reference (use correct imports/references):
{}

Rules:
1. Generate ONLY the content for this specific file: no wrapper, no explanation.
2. Use correct import paths relative to the project structure.
3. Reference other files in the project using proper import statements.
4. Follow best practices for the language.
5. Do NOT wrap in markdown code blocks: output raw code/content only.
6. Make sure exports/function signatures match what other files expect."#,
        plan.project_name,
        prompt,
        spec.path,
        spec.purpose,
        spec.language,
        other_files,
        previous_files
    )
}
