//! Console - ワークフローの呼び出し側
//!
//! # 学習ポイント
//! - アプリ単位で実行を直列化（同じアプリに 2 本目の run を流さない）
//! - ワークフローの出力（削除済み / 移管後のアプリ, CI 状態）をキャッシュへ反映
//! - キャッシュのロックは await を跨がない

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::WorkflowConfig;
use crate::domain::{
    App, AppRef, FailurePhase, RunOutcome, SagaError, TeamAppAssociation, WorkflowRun,
};
use crate::ports::{EventSink, ResourceStore};
use crate::saga::{CancelToken, SagaContext};
use crate::workflows::{
    AppDeletionWorkflow, AppTransferWorkflow, RehydratedCiState, TransferState,
};

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("app {0} already has a workflow in progress")]
    Busy(AppRef),

    #[error("run {} failed: {source}", .run.id)]
    Workflow {
        run: Box<WorkflowRun>,
        #[source]
        source: SagaError,
    },
}

impl ConsoleError {
    fn workflow(run: WorkflowRun, source: SagaError) -> Self {
        ConsoleError::Workflow {
            run: Box::new(run),
            source,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the apps of every claimed ref until dropped.
struct RunGuard<'a> {
    active: &'a Mutex<HashSet<AppRef>>,
    apps: Vec<AppRef>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut active = lock(self.active);
        for app in &self.apps {
            active.remove(app);
        }
    }
}

/// Console は workflow を起動し、その結果をローカル状態へ反映する
///
/// # 使用例
/// ```ignore
/// let console = ConsoleBuilder::new()
///     .store(Arc::new(store))
///     .event_sink(Arc::new(TracingEventSink))
///     .build()?;
/// console.delete_app(&app, &teams, CancelToken::new()).await?;
/// ```
pub struct Console<S> {
    store: Arc<S>,
    sink: Arc<dyn EventSink>,
    saga: SagaContext,
    config: WorkflowConfig,
    active: Mutex<HashSet<AppRef>>,
    apps: Mutex<HashMap<AppRef, App>>,
    ci_states: Mutex<HashMap<AppRef, RehydratedCiState>>,
    transfer_states: Mutex<HashMap<AppRef, TransferState>>,
}

impl<S: ResourceStore + 'static> Console<S> {
    pub(crate) fn new(
        store: Arc<S>,
        sink: Arc<dyn EventSink>,
        saga: SagaContext,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            sink,
            saga,
            config,
            active: Mutex::new(HashSet::new()),
            apps: Mutex::new(HashMap::new()),
            ci_states: Mutex::new(HashMap::new()),
            transfer_states: Mutex::new(HashMap::new()),
        }
    }

    /// Put an app into the local cache, as an app list view would.
    pub fn load_app(&self, app: App) {
        lock(&self.apps).insert(app.app_ref(), app);
    }

    pub fn cached_app(&self, app: &AppRef) -> Option<App> {
        lock(&self.apps).get(app).cloned()
    }

    pub fn cached_apps(&self) -> Vec<App> {
        let mut apps: Vec<_> = lock(&self.apps).values().cloned().collect();
        apps.sort_by(|a, b| a.app_ref().to_string().cmp(&b.app_ref().to_string()));
        apps
    }

    pub fn ci_state(&self, app: &AppRef) -> Option<RehydratedCiState> {
        lock(&self.ci_states).get(app).cloned()
    }

    /// Last known transfer state for an app (keyed by the source ref).
    pub fn transfer_state(&self, app: &AppRef) -> TransferState {
        lock(&self.transfer_states)
            .get(app)
            .cloned()
            .unwrap_or(TransferState::Idle)
    }

    pub fn is_busy(&self, app: &AppRef) -> bool {
        lock(&self.active).contains(app)
    }

    /// Delete an app after removing it from `teams`.
    pub async fn delete_app(
        &self,
        app: &AppRef,
        teams: &[TeamAppAssociation],
        cancel: CancelToken,
    ) -> Result<WorkflowRun, ConsoleError> {
        let _guard = self.claim(vec![app.clone()])?;

        let workflow = AppDeletionWorkflow::new(
            Arc::clone(&self.store),
            self.saga.clone(),
            Arc::clone(&self.sink),
        );
        let report = workflow.run(app, teams, cancel).await;

        match report.outcome {
            RunOutcome::Committed(()) => {
                lock(&self.apps).remove(app);
                lock(&self.ci_states).remove(app);
                info!(app = %app, run_id = %report.run.id, "app removed from cache");
                Ok(report.run)
            }
            RunOutcome::Failed(err) => Err(ConsoleError::workflow(report.run, err)),
        }
    }

    /// Move an app to `destination` and rebuild its CI state.
    ///
    /// Both the source and the destination refs are held for the whole run.
    pub async fn transfer_app(
        &self,
        app: &AppRef,
        destination: &str,
        cancel: CancelToken,
    ) -> Result<WorkflowRun, ConsoleError> {
        let moved = app.with_owner(destination);
        let _guard = self.claim(vec![app.clone(), moved.clone()])?;

        let mut workflow = AppTransferWorkflow::new(
            Arc::clone(&self.store),
            self.saga.clone(),
            Arc::clone(&self.sink),
            self.config.not_configured_error_code.clone(),
        );
        lock(&self.transfer_states).insert(app.clone(), TransferState::Pending);
        let report = workflow.run(app, destination, cancel).await;
        lock(&self.transfer_states).insert(app.clone(), workflow.state().clone());

        match report.outcome {
            RunOutcome::Committed(result) => {
                {
                    let mut apps = lock(&self.apps);
                    apps.remove(app);
                    apps.insert(result.app.app_ref(), result.app);
                }
                {
                    let mut ci_states = lock(&self.ci_states);
                    ci_states.remove(app);
                    ci_states.insert(moved, result.ci_state);
                }
                Ok(report.run)
            }
            RunOutcome::Failed(err) => {
                if err.phase() == Some(FailurePhase::PostCommit) {
                    // The backend moved the app; the old ref is stale.
                    lock(&self.apps).remove(app);
                    lock(&self.ci_states).remove(app);
                    warn!(app = %app, %destination, "transfer committed but CI state is incomplete");
                }
                Err(ConsoleError::workflow(report.run, err))
            }
        }
    }

    fn claim(&self, apps: Vec<AppRef>) -> Result<RunGuard<'_>, ConsoleError> {
        let mut active = lock(&self.active);
        if let Some(busy) = apps.iter().find(|app| active.contains(*app)) {
            warn!(app = %busy, "rejected: workflow already in progress");
            return Err(ConsoleError::Busy(busy.clone()));
        }
        active.extend(apps.iter().cloned());
        Ok(RunGuard {
            active: &self.active,
            apps,
        })
    }
}
