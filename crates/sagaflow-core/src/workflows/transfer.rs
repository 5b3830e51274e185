//! App transfer workflow.
//!
//! 1. transfer ownership (commit point, never compensated)
//! 2. list branches at the destination ("not configured for build" = no branches)
//! 3. re-fetch the app at the destination
//! 4. fetch the configuration of every configured branch (ParallelBarrier)
//! 5. re-fetch the app again and commit
//!
//! A failure after step 1 leaves the app transferred on the backend; the run
//! is still reported as failed, with [`FailurePhase::PostCommit`].
//!
//! [`FailurePhase::PostCommit`]: crate::domain::FailurePhase::PostCommit

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{
    App, AppRef, BranchConfiguration, BranchStatus, Navigation, RunOutcome, RunStatus, SagaError,
    StoreError, WorkflowEvent, WorkflowRun,
};
use crate::ports::{EventSink, ResourceStore};
use crate::saga::{CancelToken, Mode, Saga, SagaContext, SagaStep};

use super::ci_state::RehydratedCiState;
use super::messages;

/// Transfer state machine: `Idle -> Pending -> {Loaded | Failed}`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferState {
    Idle,
    Pending,
    Loaded,
    /// Retains the error for display.
    Failed(SagaError),
}

struct TransferOwnership<S> {
    store: Arc<S>,
    app: AppRef,
    destination: String,
}

#[async_trait]
impl<S: ResourceStore + 'static> SagaStep for TransferOwnership<S> {
    type Output = ();

    fn name(&self) -> String {
        format!("transfer {} to {}", self.app, self.destination)
    }

    async fn forward(&self) -> Result<(), StoreError> {
        self.store
            .transfer_ownership(&self.app, &self.destination)
            .await
    }

    fn is_commit_point(&self) -> bool {
        true
    }
}

struct ListBranches<S> {
    store: Arc<S>,
    app: AppRef,
    not_configured_code: String,
}

#[async_trait]
impl<S: ResourceStore + 'static> SagaStep for ListBranches<S> {
    type Output = Vec<BranchStatus>;

    fn name(&self) -> String {
        format!("list branches of {}", self.app)
    }

    async fn forward(&self) -> Result<Vec<BranchStatus>, StoreError> {
        match self.store.list_branches(&self.app).await {
            Err(err) if err.has_code(&self.not_configured_code) => {
                debug!(app = %self.app, "app not configured for build, no branches to rehydrate");
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

struct FetchApp<S> {
    store: Arc<S>,
    app: AppRef,
}

#[async_trait]
impl<S: ResourceStore + 'static> SagaStep for FetchApp<S> {
    type Output = App;

    fn name(&self) -> String {
        format!("fetch {}", self.app)
    }

    async fn forward(&self) -> Result<App, StoreError> {
        self.store
            .fetch_app(&self.app.owner_name, &self.app.app_name)
            .await
    }
}

/// Reads one branch's configuration for the local CI cache.
struct RehydrateBranch<S> {
    store: Arc<S>,
    app: AppRef,
    branch: String,
}

#[async_trait]
impl<S: ResourceStore + 'static> SagaStep for RehydrateBranch<S> {
    type Output = BranchConfiguration;

    fn name(&self) -> String {
        format!("rehydrate branch {} of {}", self.branch, self.app)
    }

    async fn forward(&self) -> Result<BranchConfiguration, StoreError> {
        self.store
            .get_branch_configuration(&self.app, &self.branch)
            .await
    }
}

/// What a committed transfer produces for the caller to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    /// The app record after the final re-fetch.
    pub app: App,
    pub ci_state: RehydratedCiState,
}

#[derive(Debug, Clone)]
pub struct TransferReport {
    pub run: WorkflowRun,
    pub outcome: RunOutcome<TransferResult>,
}

pub struct AppTransferWorkflow<S> {
    store: Arc<S>,
    saga: SagaContext,
    sink: Arc<dyn EventSink>,
    not_configured_code: String,
    state: TransferState,
}

impl<S: ResourceStore + 'static> AppTransferWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        saga: SagaContext,
        sink: Arc<dyn EventSink>,
        not_configured_code: impl Into<String>,
    ) -> Self {
        Self {
            store,
            saga,
            sink,
            not_configured_code: not_configured_code.into(),
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub async fn run(
        &mut self,
        app: &AppRef,
        destination: &str,
        cancel: CancelToken,
    ) -> TransferReport {
        self.state = TransferState::Pending;
        let mut saga = self.saga.start("transfer_app", cancel);
        self.sink.emit(WorkflowEvent::Progress {
            run_id: saga.run_record().id,
            status: RunStatus::Pending,
        });

        let result = self.execute(&mut saga, app, destination).await;
        let (run, outcome) = saga.finish(result);

        self.sink.emit(WorkflowEvent::Progress {
            run_id: run.id,
            status: run.status,
        });
        match &outcome {
            RunOutcome::Committed(result) => {
                self.state = TransferState::Loaded;
                self.sink.emit(WorkflowEvent::Navigate {
                    target: Navigation::App(result.app.app_ref()),
                });
                self.sink.emit(WorkflowEvent::success(messages::transfer_succeeded(
                    app,
                    destination,
                )));
                self.sink.emit(WorkflowEvent::DismissDialog);
            }
            RunOutcome::Failed(err) => {
                self.state = TransferState::Failed(err.clone());
                self.sink.emit(WorkflowEvent::error(messages::transfer_failed(
                    app,
                    destination,
                    err,
                )));
            }
        }

        TransferReport { run, outcome }
    }

    async fn execute(
        &self,
        saga: &mut Saga,
        app: &AppRef,
        destination: &str,
    ) -> Result<TransferResult, SagaError> {
        saga.step(TransferOwnership {
            store: Arc::clone(&self.store),
            app: app.clone(),
            destination: destination.to_string(),
        })
        .await?;

        // Ownership has moved; everything below targets the new namespace.
        let moved = app.with_owner(destination);

        let branches = saga
            .step(ListBranches {
                store: Arc::clone(&self.store),
                app: moved.clone(),
                not_configured_code: self.not_configured_code.clone(),
            })
            .await?;

        let fetched = saga.step(self.fetch(&moved)).await?;

        let steps: Vec<_> = branches
            .into_iter()
            .filter(|b| b.configured)
            .map(|b| RehydrateBranch {
                store: Arc::clone(&self.store),
                app: moved.clone(),
                branch: b.name,
            })
            .collect();
        let configs = saga.run(steps, Mode::ParallelBarrier).await?;

        let refreshed = saga.step(self.fetch(&moved)).await?;

        Ok(TransferResult {
            app: refreshed,
            ci_state: RehydratedCiState::new(fetched, configs),
        })
    }

    fn fetch(&self, app: &AppRef) -> FetchApp<S> {
        FetchApp {
            store: Arc::clone(&self.store),
            app: app.clone(),
        }
    }
}
