//! Events - ユーザーに見える出力（toast, 画面遷移, ダイアログ）
//!
//! Workflow は UI を直接触らず、これらのイベントを `EventSink` に流します。

use serde::{Deserialize, Serialize};

use super::ids::RunId;
use super::resource::AppRef;
use super::run::RunStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Success,
    Error,
}

/// Where the console should navigate after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "app", rename_all = "snake_case")]
pub enum Navigation {
    AppList,
    App(AppRef),
}

/// User-visible event emitted by a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Progress indicator bound to run status.
    Progress { run_id: RunId, status: RunStatus },

    /// Terminal notification.
    Toast { level: ToastLevel, message: String },

    Navigate { target: Navigation },

    /// Close the transfer confirmation dialog.
    DismissDialog,
}

impl WorkflowEvent {
    pub fn success(message: impl Into<String>) -> Self {
        WorkflowEvent::Toast {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        WorkflowEvent::Toast {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}
