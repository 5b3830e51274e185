//! Outcome model: the terminal result of a workflow run.

use super::errors::SagaError;

/// What a run resolved to.
///
/// From the user's perspective an operation either wholly succeeded or wholly
/// failed, even when the backend was left partially mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Committed(T),
    Failed(SagaError),
}

impl<T> RunOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, RunOutcome::Committed(_))
    }

    pub fn error(&self) -> Option<&SagaError> {
        match self {
            RunOutcome::Failed(err) => Some(err),
            RunOutcome::Committed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, SagaError> {
        match self {
            RunOutcome::Committed(value) => Ok(value),
            RunOutcome::Failed(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, SagaError>> for RunOutcome<T> {
    fn from(result: Result<T, SagaError>) -> Self {
        match result {
            Ok(value) => RunOutcome::Committed(value),
            Err(err) => RunOutcome::Failed(err),
        }
    }
}
