//! Workflow step record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::ids::StepId;

/// Whether the step moves the run forward or undoes a previous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Forward,
    Compensating,
}

/// Step state.
///
/// State transitions:
/// - Pending -> Succeeded
/// - Pending -> Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
}

/// One forward or compensating step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub name: String,
    pub kind: StepKind,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StoreError>,

    /// For compensating steps: the forward step being undone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensates: Option<StepId>,

    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn forward(id: StepId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: StepKind::Forward,
            status: StepStatus::Pending,
            error: None,
            compensates: None,
            started_at: now,
            finished_at: None,
        }
    }

    pub fn compensating(
        id: StepId,
        name: impl Into<String>,
        compensates: StepId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: StepKind::Compensating,
            compensates: Some(compensates),
            ..Self::forward(id, name, now)
        }
    }

    pub fn mark_succeeded(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::Succeeded;
        self.finished_at = Some(now);
    }

    pub fn mark_failed(&mut self, error: StoreError, now: DateTime<Utc>) {
        self.status = StepStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(now);
    }
}
