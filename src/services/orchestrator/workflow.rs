//! Workflow Tracker
//!
//! Step statuses and durations for one run.

use std::collections::HashMap;
use std::time::Instant;

use uber_codegen_core::StageKind;

use crate::models::run::{StepStatus, WorkflowStep};

#[derive(Debug, Default)]
pub struct WorkflowTracker {
    steps: Vec<WorkflowStep>,
    started: HashMap<String, Instant>,
}

impl WorkflowTracker {
    /// All `stages` pending, in order.
    pub fn new(stages: &[StageKind]) -> Self {
        Self {
            steps: stages.iter().map(|s| WorkflowStep::pending(*s)).collect(),
            started: HashMap::new(),
        }
    }

    /// Append a step that was not known up front (the planner, once a run escalates).
    pub fn insert_after(&mut self, after: StageKind, stage: StageKind) {
        if self.position(stage).is_some() {
            return;
        }
        let index = self
            .position(after)
            .map_or(self.steps.len(), |i| i + 1);
        self.steps.insert(index, WorkflowStep::pending(stage));
    }

    pub fn start(&mut self, stage: StageKind) {
        let id = stage.agent_name();
        self.started.insert(id.to_string(), Instant::now());
        if let Some(step) = self.step_mut(stage) {
            step.status = StepStatus::Active;
        }
    }

    /// Mark complete and return the step's duration in seconds.
    pub fn complete(&mut self, stage: StageKind, message: Option<String>) -> f64 {
        self.finish(stage, StepStatus::Complete, message)
    }

    pub fn fail(&mut self, stage: StageKind, message: impl Into<String>) -> f64 {
        self.finish(stage, StepStatus::Error, Some(message.into()))
    }

    /// Fail every step still active, returning their ids.
    pub fn fail_active(&mut self, message: &str) -> Vec<String> {
        let active: Vec<StageKind> = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Active)
            .filter_map(|s| StageKind::from_agent_name(&s.id))
            .collect();
        active
            .into_iter()
            .map(|stage| {
                self.fail(stage, message);
                stage.agent_name().to_string()
            })
            .collect()
    }

    pub fn step(&self, stage: StageKind) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == stage.agent_name())
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<WorkflowStep> {
        self.steps
    }

    fn finish(&mut self, stage: StageKind, status: StepStatus, message: Option<String>) -> f64 {
        let elapsed = self
            .started
            .remove(stage.agent_name())
            .map_or(0.0, |t| t.elapsed().as_secs_f64());
        let duration = (elapsed * 100.0).round() / 100.0;
        if let Some(step) = self.step_mut(stage) {
            step.status = status;
            step.duration = Some(duration);
            step.message = message;
        }
        duration
    }

    fn step_mut(&mut self, stage: StageKind) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == stage.agent_name())
    }

    fn position(&self, stage: StageKind) -> Option<usize> {
        self.steps.iter().position(|s| s.id == stage.agent_name())
    }
}
