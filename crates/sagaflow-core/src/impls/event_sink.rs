//! EventSink implementations.

use std::sync::Mutex;

use tracing::{error, info};

use crate::domain::{ToastLevel, WorkflowEvent};
use crate::ports::EventSink;

/// Renders user-visible events as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::Toast {
                level: ToastLevel::Error,
                message,
            } => error!(%message, "toast"),
            WorkflowEvent::Toast { message, .. } => info!(%message, "toast"),
            WorkflowEvent::Progress { run_id, status } => {
                info!(%run_id, ?status, "progress")
            }
            WorkflowEvent::Navigate { target } => info!(?target, "navigate"),
            WorkflowEvent::DismissDialog => info!("dialog dismissed"),
        }
    }
}

/// Keeps every event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: WorkflowEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
