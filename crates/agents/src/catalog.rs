//! Agent Catalog
//!
//! Static descriptions of every agent and the stage DAG for each mode, for
//! clients that render the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use uber_codegen_core::{PipelineMode, StageKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    pub mode: PipelineMode,
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
    pub execution_order: Vec<String>,
}

pub fn describe(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Classifier => "Decides whether a request needs one file or a whole project",
        StageKind::Planner => "Plans the file structure of multi-file projects",
        StageKind::Generator => {
            "Generates clean, production-ready code from natural language prompts"
        }
        StageKind::Validator => {
            "Validates code for style, syntax, and best practices with auto-fix capability"
        }
        StageKind::Tester => {
            "Analyzes code testability, adds error handling, and suggests test cases"
        }
        StageKind::Security => {
            "Scans for security vulnerabilities and automatically applies fixes"
        }
    }
}

pub fn agent_info(stage: StageKind) -> AgentInfo {
    AgentInfo {
        id: stage.agent_name().to_string(),
        name: stage.display_name().to_string(),
        description: describe(stage).to_string(),
    }
}

/// Every agent, in DAG order.
pub fn agent_catalog() -> Vec<AgentInfo> {
    StageKind::ALL.into_iter().map(agent_info).collect()
}

/// Stages a run of `mode` goes through.
pub fn pipeline_stages(mode: PipelineMode) -> Vec<StageKind> {
    let mut stages = vec![StageKind::Classifier];
    if mode == PipelineMode::Multi {
        stages.push(StageKind::Planner);
    }
    stages.extend([
        StageKind::Generator,
        StageKind::Validator,
        StageKind::Tester,
        StageKind::Security,
    ]);
    stages
}

/// The linear chain of `mode` as a DAG with its topological order.
pub fn workflow_graph(mode: PipelineMode) -> WorkflowGraph {
    let stages = pipeline_stages(mode);
    let edges: Vec<(StageKind, StageKind)> = stages.windows(2).map(|w| (w[0], w[1])).collect();
    let order = topological_order(&stages, &edges);

    WorkflowGraph {
        mode,
        nodes: stages.iter().map(|s| s.agent_name().to_string()).collect(),
        edges: edges
            .iter()
            .map(|(from, to)| (from.agent_name().to_string(), to.agent_name().to_string()))
            .collect(),
        execution_order: order.iter().map(|s| s.agent_name().to_string()).collect(),
    }
}

/// Kahn's algorithm; ties broken by stage order.
fn topological_order(nodes: &[StageKind], edges: &[(StageKind, StageKind)]) -> Vec<StageKind> {
    let mut indegree: BTreeMap<StageKind, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    for (_, to) in edges {
        if let Some(count) = indegree.get_mut(to) {
            *count += 1;
        }
    }

    let mut order = Vec::with_capacity(nodes.len());
    loop {
        let ready = indegree
            .iter()
            .find(|(_, count)| **count == 0)
            .map(|(node, _)| *node);
        let Some(next) = ready else { break };
        indegree.remove(&next);
        order.push(next);
        for (_, to) in edges.iter().filter(|(from, _)| *from == next) {
            if let Some(count) = indegree.get_mut(to) {
                *count = count.saturating_sub(1);
            }
        }
    }
    order
}
