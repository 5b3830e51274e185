//! EventSink port - ユーザーに見える出力の抽象化
//!
//! Toast / 画面遷移 / ダイアログ操作を workflow から切り離します。

use crate::domain::WorkflowEvent;

/// Receives user-visible workflow events.
///
/// Emission is fire-and-forget: a sink must not fail the run.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: WorkflowEvent);
}
