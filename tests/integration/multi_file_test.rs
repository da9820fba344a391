//! Multi-File Integration Tests
//!
//! Planning, plan-ordered generation with prior-file context, and the
//! file-marker guard on bundle rewrites.

use serde_json::json;

use uber_codegen::{GenerateRequest, RunPhase, StepStatus};
use uber_codegen_core::artifact::{file_markers, join_files};
use uber_codegen_core::{CodeArtifact, FileBundle, PipelineMode, StageKind};
use uber_codegen_llm::{RecordedRequest, ScriptedProvider, ScriptedReply};

use super::support::*;

const PROMPT: &str = "build a calculator project";

fn plan_reply() -> ScriptedReply {
    json_reply(json!({
        "project_name": "calc",
        "description": "Calculator",
        "files": [
            {"path": "README.md", "purpose": "Docs", "language": "markdown"},
            {"path": "a.py", "purpose": "Module A", "language": "python"},
            {"path": "b.py", "purpose": "Module B", "language": "python"},
            {"path": "c.py", "purpose": "Module C", "language": "python"},
            {"path": "d.py", "purpose": "Module D", "language": "python"},
        ]
    }))
}

fn generating(request: &RecordedRequest) -> Option<String> {
    request
        .input
        .lines()
        .find_map(|line| line.strip_prefix("You are generating: "))
        .map(str::to_string)
}

fn file_content(path: &str) -> String {
    match path.strip_suffix(".py") {
        Some(name) => format!("def {}():\n    return '{}'\n", name, name),
        None => "# Calc\n".to_string(),
    }
}

/// Project script: classifier says multi, `validator` decides the validator reply.
fn project_script<F>(validator: F) -> ScriptedProvider
where
    F: Fn(&RecordedRequest) -> ScriptedReply + Send + Sync + 'static,
{
    ScriptedProvider::new(move |request| match stage_of(request) {
        Some(StageKind::Classifier) => json_reply(json!({"mode": "multi", "reason": "several modules"})),
        Some(StageKind::Planner) => plan_reply(),
        Some(StageKind::Generator) => match generating(request) {
            Some(path) => ScriptedReply::Text(file_content(&path)),
            None => ScriptedReply::Fail("single-file prompt in a project run".into()),
        },
        Some(StageKind::Validator) => validator(request),
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    })
}

fn generated_bundle() -> FileBundle {
    ["README.md", "a.py", "b.py", "c.py", "d.py"]
        .iter()
        .map(|p| (p.to_string(), file_content(p)))
        .collect()
}

fn source_bundle(files: &FileBundle) -> String {
    join_files(files.iter().filter(|(p, _)| p.ends_with(".py")))
}

#[tokio::test]
async fn test_files_generated_in_plan_order_with_prior_context() {
    let (pipeline, provider) = pipeline(project_script(|_| passing(StageKind::Validator)));

    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    assert_eq!(run.mode, PipelineMode::Multi);
    assert_eq!(run.phase, RunPhase::Complete);
    assert_eq!(run.code, CodeArtifact::Multi(generated_bundle()));

    let order: Vec<String> = requests_for(&provider, StageKind::Generator)
        .iter()
        .filter_map(generating)
        .collect();
    assert_eq!(order, vec!["README.md", "a.py", "b.py", "c.py", "d.py"]);

    let c_request = requests_for(&provider, StageKind::Generator)
        .into_iter()
        .find(|r| generating(r).as_deref() == Some("c.py"))
        .unwrap();
    assert!(c_request.input.contains("--- a.py ---\ndef a():"));
    assert!(c_request.input.contains("--- b.py ---"));
    assert!(!c_request.input.contains("--- c.py ---"));
    assert!(!c_request.input.contains("--- d.py ---"));
    assert!(c_request.input.contains("  - d.py (Module D)"));

    let ids: Vec<_> = run.workflow.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["classifier", "planner", "code_generator", "validator", "testing", "security"]
    );
    assert!(run.workflow.iter().all(|s| s.status == StepStatus::Complete));

    assert_eq!(run.plan.as_ref().unwrap().project_name, "calc");
    assert_eq!(run.files.len(), 5);
    assert_eq!(run.stats.total_files, Some(5));
    assert!(run.files.iter().all(|f| !f.was_fixed));
}

#[tokio::test]
async fn test_analysis_sees_only_source_files_once() {
    let (pipeline, provider) = pipeline(project_script(|_| passing(StageKind::Validator)));
    pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    let validator = requests_for(&provider, StageKind::Validator);
    assert_eq!(validator.len(), 1);
    assert_eq!(
        file_markers(&validator[0].input),
        vec!["a.py", "b.py", "c.py", "d.py"]
    );
}

#[tokio::test]
async fn test_bundle_fix_updates_only_changed_file() {
    let (pipeline, _) = pipeline(project_script(|_| {
        let mut files = generated_bundle();
        files.insert("b.py".into(), "def b():\n    return 'B'\n".into());
        fixing(StageKind::Validator, "Uppercased b", &source_bundle(&files))
    }));

    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    let files = run.code.files().unwrap();
    assert_eq!(files["b.py"], "def b():\n    return 'B'\n");
    assert_eq!(files["a.py"], file_content("a.py"));
    assert_eq!(files["README.md"], "# Calc\n");
    assert_eq!(run.total_fixes, 1);

    let fixed: Vec<_> = run.files.iter().filter(|f| f.was_fixed).map(|f| f.path.as_str()).collect();
    assert_eq!(fixed, vec!["b.py"]);
    let b = run.files.iter().find(|f| f.path == "b.py").unwrap();
    assert_eq!(b.original_content.as_deref(), Some("def b():\n    return 'b'\n"));
}

#[tokio::test]
async fn test_dropped_file_marker_discards_the_rewrite() {
    let (pipeline, _) = pipeline(project_script(|_| {
        let mut files = generated_bundle();
        files.shift_remove("d.py");
        files.insert("a.py".into(), "def a():\n    return 'A'\n".into());
        fixing(StageKind::Validator, "Merged modules", &source_bundle(&files))
    }));

    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    assert_eq!(run.code, CodeArtifact::Multi(generated_bundle()));
    assert_eq!(run.total_fixes, 0);
    assert!(!run.code_was_fixed);
    let validation = run.validation.as_ref().unwrap();
    assert!(validation.fixes.is_empty());
    assert!(validation.warnings[0].contains("expected 4 file markers, got 3"));
    assert_eq!(run.phase, RunPhase::Complete);
}

#[tokio::test]
async fn test_renamed_file_marker_discards_the_rewrite() {
    let (pipeline, _) = pipeline(project_script(|_| {
        let renamed = source_bundle(&generated_bundle()).replace("<!-- c.py -->", "<!-- calc.py -->");
        fixing(StageKind::Validator, "Renamed c", &renamed)
    }));

    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();
    assert_eq!(run.code, CodeArtifact::Multi(generated_bundle()));
    assert!(run.validation.as_ref().unwrap().warnings[0].contains("file markers"));
}

#[tokio::test]
async fn test_keyword_scan_escalates_model_single_verdict() {
    let (pipeline, provider) = pipeline(ScriptedProvider::new(|request| match stage_of(request) {
        Some(StageKind::Classifier) => json_reply(json!({"mode": "single"})),
        Some(StageKind::Planner) => ScriptedReply::Fail("planner down".into()),
        Some(StageKind::Generator) => match generating(request) {
            Some(path) => ScriptedReply::Text(file_content(&path)),
            None => ScriptedReply::Fail("single-file prompt in a project run".into()),
        },
        Some(stage) => passing(stage),
        None => ScriptedReply::Fail("unexpected".into()),
    }));

    let run = pipeline
        .run(GenerateRequest::new("build a todo app with login"))
        .await
        .unwrap();

    assert_eq!(run.mode, PipelineMode::Multi);
    assert_eq!(run.mode_reason.as_deref(), Some("detected 'app' in prompt"));
    assert_eq!(requests_for(&provider, StageKind::Planner).len(), 1);

    // Planner outage falls back to the default layout
    let plan = run.plan.as_ref().unwrap();
    assert_eq!(plan.project_name, "generated-project");
    let paths: Vec<_> = plan.paths().collect();
    assert_eq!(paths, vec!["README.md", "requirements.txt", "main.py", "utils.py"]);
    assert!(run.warnings.iter().any(|w| w.starts_with("planner:")));
    assert_eq!(run.files.len(), 4);
}

/// Project script over an explicit plan; `rewrite` answers `stage` with a fix.
fn planned_script<F>(
    paths: &'static [&'static str],
    stage: StageKind,
    rewrite: F,
) -> ScriptedProvider
where
    F: Fn(&RecordedRequest) -> ScriptedReply + Send + Sync + 'static,
{
    ScriptedProvider::new(move |request| match stage_of(request) {
        Some(StageKind::Classifier) => json_reply(json!({"mode": "multi", "reason": "modules"})),
        Some(StageKind::Planner) => json_reply(json!({
            "project_name": "calc",
            "files": paths
                .iter()
                .map(|p| json!({"path": p, "purpose": "Module", "language": "python"}))
                .collect::<Vec<_>>(),
        })),
        Some(StageKind::Generator) => match generating(request) {
            Some(path) => ScriptedReply::Text(file_content(&path)),
            None => ScriptedReply::Fail("single-file prompt in a project run".into()),
        },
        Some(s) if s == stage => rewrite(request),
        Some(s) => passing(s),
        None => ScriptedReply::Fail("unexpected".into()),
    })
}

#[tokio::test]
async fn test_spaced_plan_path_keeps_files_apart_through_a_fix() {
    let (pipeline, provider) = pipeline(planned_script(
        &["a.py", "my utils.py"],
        StageKind::Validator,
        |_| {
            let mut files = FileBundle::new();
            files.insert("a.py".into(), "def a():\n    return 'A'\n".into());
            files.insert("my_utils.py".into(), file_content("my_utils.py"));
            fixing(StageKind::Validator, "Uppercased a", &join_files(&files))
        },
    ));

    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    let paths: Vec<_> = run.plan.as_ref().unwrap().paths().collect();
    assert_eq!(paths, vec!["a.py", "my_utils.py"]);
    let validator = requests_for(&provider, StageKind::Validator);
    assert_eq!(file_markers(&validator[0].input), vec!["a.py", "my_utils.py"]);

    let files = run.code.files().unwrap();
    assert_eq!(files["a.py"], "def a():\n    return 'A'\n");
    assert!(!files["a.py"].contains("<!--"));
    assert_eq!(files["my_utils.py"], file_content("my_utils.py"));
    assert_eq!(run.total_fixes, 1);
}

#[tokio::test]
async fn test_security_rewrite_dropping_a_file_is_discarded() {
    let (pipeline, _) = pipeline(planned_script(
        &["a.py", "b.py", "c.py"],
        StageKind::Security,
        |_| {
            let mut files = FileBundle::new();
            files.insert("a.py".into(), "def a():\n    return 'safe'\n".into());
            files.insert("b.py".into(), file_content("b.py"));
            fixing(StageKind::Security, "Sanitized a", &join_files(&files))
        },
    ));

    let run = pipeline.run(GenerateRequest::new(PROMPT)).await.unwrap();

    let expected: FileBundle = ["a.py", "b.py", "c.py"]
        .iter()
        .map(|p| (p.to_string(), file_content(p)))
        .collect();
    assert_eq!(run.code, CodeArtifact::Multi(expected));
    assert_eq!(run.total_fixes, 0);
    let security = run.security.as_ref().unwrap();
    assert!(security.fixes.is_empty());
    assert!(security
        .warnings
        .iter()
        .any(|w| w.contains("expected 3 file markers, got 2")));
    assert!(run.warnings.iter().any(|w| w.starts_with("security:")));
    assert_eq!(run.phase, RunPhase::Complete);
}
