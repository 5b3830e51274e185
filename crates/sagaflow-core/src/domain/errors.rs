//! Errors - エラー型と分類
//!
//! - `StoreError`: リモート呼び出しの構造化された失敗（status + code）
//! - `SagaError`: run を終端させた原因
//! - `FailurePhase`: 失敗がどの段階で起きたかの運用分類

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable code the store uses when a transfer needs org admin rights.
pub const MUST_BE_ORG_ADMIN: &str = "must_be_org_admin";

/// Machine-readable code for branch listing on an app with no build setup.
pub const NOT_CONFIGURED_FOR_BUILD: &str = "app_not_configured_for_build";

/// Structured failure reported by the resource store.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("store call failed (status {status}{}): {message}", .code.as_deref().map(|c| format!(", code {c}")).unwrap_or_default())]
pub struct StoreError {
    /// HTTP-like status code.
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

/// Where in the run a failure happened.
///
/// - `PreCondition`: nothing had committed yet
/// - `MidRun`: compensable steps had committed and were compensated
/// - `PostCommit`: an irreversible commit point had already succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    PreCondition,
    MidRun,
    PostCommit,
}

/// Cause of a run ending in `Failed`.
///
/// Compensation failures never appear here; they are logged and recorded on
/// the run, and the original trigger is what the caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SagaError {
    #[error("step '{step}' failed: {source}")]
    Step {
        step: String,
        phase: FailurePhase,
        #[source]
        source: StoreError,
    },

    #[error("run cancelled")]
    Cancelled { phase: FailurePhase },

    #[error("run already terminated")]
    RunTerminated,
}

impl SagaError {
    pub fn phase(&self) -> Option<FailurePhase> {
        match self {
            SagaError::Step { phase, .. } | SagaError::Cancelled { phase } => Some(*phase),
            SagaError::RunTerminated => None,
        }
    }

    /// The store failure that triggered this error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            SagaError::Step { source, .. } => Some(source),
            _ => None,
        }
    }
}
