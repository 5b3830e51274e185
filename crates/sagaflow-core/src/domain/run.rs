//! Workflow run record and status management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{SagaError, StoreError};
use super::ids::{RunId, StepId};
use super::step::{StepKind, WorkflowStep};

/// Overall run state.
///
/// Once `Succeeded` or `Failed`, no further forward or compensating step may
/// be recorded on the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

/// In-memory record of one workflow run.
///
/// Design: same pattern as the step record.
/// - Single source of truth for the run's bookkeeping
/// - State transitions via methods, never by poking fields from the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow: String,

    /// Steps in the order they were issued (forward and compensating).
    pub steps: Vec<WorkflowStep>,
    pub status: RunStatus,

    /// Number of forward steps that reached `Succeeded`.
    pub committed_count: usize,

    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    pub fn new(id: RunId, workflow: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            workflow: workflow.into(),
            steps: Vec::new(),
            status: RunStatus::Pending,
            committed_count: 0,
            started_at: now,
            finished_at: None,
        }
    }

    /// Record a newly issued step.
    pub fn push_step(&mut self, step: WorkflowStep) -> Result<(), SagaError> {
        if self.status.is_terminal() {
            return Err(SagaError::RunTerminated);
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn mark_step_succeeded(&mut self, id: StepId, now: DateTime<Utc>) {
        if let Some(step) = self.step_mut(id) {
            step.mark_succeeded(now);
            if step.kind == StepKind::Forward {
                self.committed_count += 1;
            }
        }
    }

    pub fn mark_step_failed(&mut self, id: StepId, error: StoreError, now: DateTime<Utc>) {
        if let Some(step) = self.step_mut(id) {
            step.mark_failed(error, now);
        }
    }

    pub fn mark_succeeded(&mut self, now: DateTime<Utc>) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(now);
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>) {
        self.status = RunStatus::Failed;
        self.finished_at = Some(now);
    }

    pub fn step(&self, id: StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    fn step_mut(&mut self, id: StepId) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn forward_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.iter().filter(|s| s.kind == StepKind::Forward)
    }

    pub fn compensating_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.iter().filter(|s| s.kind == StepKind::Compensating)
    }
}
