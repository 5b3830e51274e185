//! App deletion workflow.
//!
//! 1. disassociate every team (ParallelBarrier)
//! 2. delete the app
//!
//! Any failure re-associates the teams that were already removed, with the
//! same options used to remove them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    AppRef, Navigation, RunOutcome, RunStatus, SagaError, StoreError, TeamAppAssociation,
    WorkflowEvent, WorkflowRun,
};
use crate::ports::{EventSink, ResourceStore};
use crate::saga::{CancelToken, Compensation, Mode, Saga, SagaContext, SagaStep};

use super::messages;

struct DisassociateTeam<S> {
    store: Arc<S>,
    association: TeamAppAssociation,
}

#[async_trait]
impl<S: ResourceStore + 'static> SagaStep for DisassociateTeam<S> {
    type Output = ();

    fn name(&self) -> String {
        format!(
            "disassociate {} from {}",
            self.association.team, self.association.app
        )
    }

    async fn forward(&self) -> Result<(), StoreError> {
        let a = &self.association;
        self.store.disassociate(&a.team, &a.app, &a.options).await
    }

    fn compensation(&self) -> Option<Box<dyn Compensation>> {
        Some(Box::new(ReassociateTeam {
            store: Arc::clone(&self.store),
            association: self.association.clone(),
        }))
    }
}

struct ReassociateTeam<S> {
    store: Arc<S>,
    association: TeamAppAssociation,
}

#[async_trait]
impl<S: ResourceStore + 'static> Compensation for ReassociateTeam<S> {
    fn name(&self) -> String {
        format!(
            "re-associate {} with {}",
            self.association.team, self.association.app
        )
    }

    async fn compensate(&self) -> Result<(), StoreError> {
        let a = &self.association;
        self.store.associate(&a.team, &a.app, &a.options).await
    }
}

struct DeleteApp<S> {
    store: Arc<S>,
    app: AppRef,
}

#[async_trait]
impl<S: ResourceStore + 'static> SagaStep for DeleteApp<S> {
    type Output = ();

    fn name(&self) -> String {
        format!("delete {}", self.app)
    }

    async fn forward(&self) -> Result<(), StoreError> {
        self.store.delete_app(&self.app).await
    }
}

/// Terminal record of a deletion run.
#[derive(Debug, Clone)]
pub struct DeletionReport {
    pub run: WorkflowRun,
    pub outcome: RunOutcome<()>,
}

pub struct AppDeletionWorkflow<S> {
    store: Arc<S>,
    saga: SagaContext,
    sink: Arc<dyn EventSink>,
}

impl<S: ResourceStore + 'static> AppDeletionWorkflow<S> {
    pub fn new(store: Arc<S>, saga: SagaContext, sink: Arc<dyn EventSink>) -> Self {
        Self { store, saga, sink }
    }

    /// Delete `app` after removing it from `teams`.
    ///
    /// `teams` is the caller's current view of the app's team associations;
    /// it is not recomputed here.
    pub async fn run(
        &self,
        app: &AppRef,
        teams: &[TeamAppAssociation],
        cancel: CancelToken,
    ) -> DeletionReport {
        let mut saga = self.saga.start("delete_app", cancel);
        self.sink.emit(WorkflowEvent::Progress {
            run_id: saga.run_record().id,
            status: RunStatus::Pending,
        });

        let result = self.execute(&mut saga, app, teams).await;
        let (run, outcome) = saga.finish(result);

        self.sink.emit(WorkflowEvent::Progress {
            run_id: run.id,
            status: run.status,
        });
        match &outcome {
            RunOutcome::Committed(()) => {
                self.sink
                    .emit(WorkflowEvent::success(messages::deletion_succeeded(app)));
                self.sink.emit(WorkflowEvent::Navigate {
                    target: Navigation::AppList,
                });
            }
            RunOutcome::Failed(err) => {
                self.sink
                    .emit(WorkflowEvent::error(messages::deletion_failed(app, err)));
            }
        }

        DeletionReport { run, outcome }
    }

    async fn execute(
        &self,
        saga: &mut Saga,
        app: &AppRef,
        teams: &[TeamAppAssociation],
    ) -> Result<(), SagaError> {
        if !teams.is_empty() {
            let steps: Vec<_> = teams
                .iter()
                .map(|association| DisassociateTeam {
                    store: Arc::clone(&self.store),
                    association: association.clone(),
                })
                .collect();
            saga.run(steps, Mode::ParallelBarrier).await?;
        }

        saga.step(DeleteApp {
            store: Arc::clone(&self.store),
            app: app.clone(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        App, AssociationOptions, FailurePhase, Permission, StepKind, StepStatus, TeamKey,
        ToastLevel,
    };
    use crate::impls::{CallEvent, CallKind, Fault, InMemoryResourceStore, RecordingEventSink, StoreCall};
    use crate::ports::{Clock, SystemClock, UlidGenerator};
    use rstest::rstest;
    use std::time::Duration;

    fn app() -> App {
        App::new("app-a", "alice", "A")
    }

    fn team(n: usize) -> TeamKey {
        TeamKey::new("acme", format!("T{n}"))
    }

    fn associations(n: usize) -> Vec<TeamAppAssociation> {
        (1..=n)
            .map(|i| {
                let permission = if i % 2 == 0 {
                    Permission::Manager
                } else {
                    Permission::Developer
                };
                TeamAppAssociation::new(team(i), app().app_ref(), AssociationOptions::new(permission))
            })
            .collect()
    }

    fn seeded(n: usize) -> InMemoryResourceStore {
        associations(n).into_iter().fold(
            InMemoryResourceStore::new().with_app(app()),
            |store, a| store.with_association(a.team, &a.app, a.options),
        )
    }

    fn workflow(
        store: InMemoryResourceStore,
    ) -> (
        AppDeletionWorkflow<InMemoryResourceStore>,
        Arc<InMemoryResourceStore>,
        Arc<RecordingEventSink>,
    ) {
        let store = Arc::new(store);
        let sink = Arc::new(RecordingEventSink::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let saga = SagaContext::new(Arc::new(UlidGenerator::new(Arc::clone(&clock))), clock);
        let wf = AppDeletionWorkflow::new(Arc::clone(&store), saga, sink.clone());
        (wf, store, sink)
    }

    fn toast(sink: &RecordingEventSink) -> Option<(ToastLevel, String)> {
        sink.events().into_iter().find_map(|e| match e {
            WorkflowEvent::Toast { level, message } => Some((level, message)),
            _ => None,
        })
    }

    #[tokio::test]
    async fn app_without_teams_is_deleted_with_a_single_call() {
        let (wf, store, sink) = workflow(seeded(0));

        let report = wf.run(&app().app_ref(), &[], CancelToken::new()).await;

        assert!(report.outcome.is_committed());
        assert_eq!(report.run.status, RunStatus::Succeeded);
        assert_eq!(
            store.calls().await,
            vec![StoreCall::DeleteApp { app: app().app_ref() }]
        );
        assert!(sink.events().contains(&WorkflowEvent::Navigate {
            target: Navigation::AppList
        }));
    }

    #[tokio::test]
    async fn failed_delete_without_teams_needs_no_compensation() {
        let store = seeded(0).with_fault(Fault::on(CallKind::DeleteApp, StoreError::forbidden("no")));
        let (wf, store, _sink) = workflow(store);

        let report = wf.run(&app().app_ref(), &[], CancelToken::new()).await;

        assert_eq!(
            report.outcome.error().and_then(|e| e.phase()),
            Some(FailurePhase::PreCondition)
        );
        assert_eq!(store.calls().await.len(), 1);
        assert!(store.app(&app().app_ref()).await.is_some());
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    #[tokio::test]
    async fn delete_failure_reassociates_every_team(#[case] n: usize) {
        let store = seeded(n).with_fault(Fault::on(CallKind::DeleteApp, StoreError::forbidden("no")));
        let (wf, store, _sink) = workflow(store);
        let teams = associations(n);

        let report = wf.run(&app().app_ref(), &teams, CancelToken::new()).await;

        assert_eq!(report.run.status, RunStatus::Failed);
        let calls = store.calls().await;
        let mut disassociated: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::Disassociate { team, options, .. } => Some((team.clone(), options.clone())),
                _ => None,
            })
            .collect();
        let mut reassociated: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::Associate { team, options, .. } => Some((team.clone(), options.clone())),
                _ => None,
            })
            .collect();
        disassociated.sort_by(|a, b| a.0.cmp(&b.0));
        reassociated.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(reassociated.len(), n);
        assert_eq!(reassociated, disassociated);

        // Relations are back the way they were.
        assert_eq!(store.teams_of(&app().app_ref()).await.len(), n);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[tokio::test]
    async fn full_success_commits_without_compensation(#[case] n: usize) {
        let (wf, store, _sink) = workflow(seeded(n));

        let report = wf
            .run(&app().app_ref(), &associations(n), CancelToken::new())
            .await;

        assert!(report.outcome.is_committed());
        assert_eq!(store.count(CallKind::Associate).await, 0);
        assert_eq!(store.count(CallKind::Disassociate).await, n);
        assert_eq!(store.count(CallKind::DeleteApp).await, 1);
        assert_eq!(report.run.committed_count, n + 1);
        assert!(report.run.compensating_steps().next().is_none());
        assert!(store.app(&app().app_ref()).await.is_none());
    }

    #[tokio::test]
    async fn forbidden_delete_scenario() {
        let store = seeded(2).with_fault(Fault::on(CallKind::DeleteApp, StoreError::forbidden("no")));
        let (wf, store, sink) = workflow(store);

        let report = wf
            .run(&app().app_ref(), &associations(2), CancelToken::new())
            .await;

        let err = report.outcome.error().cloned().unwrap();
        assert_eq!(err.phase(), Some(FailurePhase::MidRun));
        assert_eq!(err.store_error().map(|e| e.status), Some(403));

        let mut associated: Vec<TeamKey> = store
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Associate { team, .. } => Some(team),
                _ => None,
            })
            .collect();
        associated.sort();
        assert_eq!(associated, vec![team(1), team(2)]);

        let (level, message) = toast(&sink).unwrap();
        assert_eq!(level, ToastLevel::Error);
        assert!(message.contains("not allowed to delete app"));
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::Navigate { .. })));
    }

    #[tokio::test]
    async fn failed_disassociation_fails_the_run_instead_of_stalling() {
        let store = seeded(3).with_fault(
            Fault::on(CallKind::Disassociate, StoreError::new(500, "down")).for_team(team(2)),
        );
        let (wf, store, _sink) = workflow(store);

        let report = wf
            .run(&app().app_ref(), &associations(3), CancelToken::new())
            .await;

        assert_eq!(report.run.status, RunStatus::Failed);
        assert_eq!(store.count(CallKind::DeleteApp).await, 0);

        // Only the relations that were actually removed are restored.
        let mut associated: Vec<TeamKey> = store
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Associate { team, .. } => Some(team),
                _ => None,
            })
            .collect();
        associated.sort();
        assert_eq!(associated, vec![team(1), team(3)]);
        assert_eq!(store.teams_of(&app().app_ref()).await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn compensation_waits_for_slow_disassociation() {
        let store = seeded(2)
            .with_latency(CallKind::Disassociate, Some(team(1)), Duration::from_millis(200))
            .with_fault(Fault::on(CallKind::Disassociate, StoreError::new(500, "down")).for_team(team(2)));
        let (wf, store, _sink) = workflow(store);

        let report = wf
            .run(&app().app_ref(), &associations(2), CancelToken::new())
            .await;
        assert_eq!(report.run.status, RunStatus::Failed);

        let events = store.events().await;
        let slow_resolved = events
            .iter()
            .position(|e| {
                matches!(e, CallEvent::Resolved { call: StoreCall::Disassociate { team: t, .. }, .. } if *t == team(1))
            })
            .unwrap();
        let reassociate_issued = events
            .iter()
            .position(|e| {
                matches!(e, CallEvent::Issued(StoreCall::Associate { team: t, .. }) if *t == team(1))
            })
            .unwrap();
        assert!(slow_resolved < reassociate_issued);
    }

    #[tokio::test]
    async fn failing_compensation_keeps_original_error() {
        let store = seeded(2)
            .with_fault(Fault::on(CallKind::DeleteApp, StoreError::forbidden("no")))
            .with_fault(Fault::on(CallKind::Associate, StoreError::new(500, "down")).for_team(team(1)));
        let (wf, store, _sink) = workflow(store);

        let report = wf
            .run(&app().app_ref(), &associations(2), CancelToken::new())
            .await;

        let err = report.outcome.error().unwrap();
        assert_eq!(err.store_error().map(|e| e.status), Some(403));
        assert_eq!(store.count(CallKind::Associate).await, 2);

        let failed: Vec<_> = report
            .run
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Compensating && s.status == StepStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_barrier_skips_delete_and_restores_teams() {
        let store = seeded(2).with_latency(CallKind::Disassociate, None, Duration::from_millis(100));
        let (wf, store, _sink) = workflow(store);
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let report = wf.run(&app().app_ref(), &associations(2), cancel).await;

        assert!(matches!(
            report.outcome.error(),
            Some(SagaError::Cancelled { phase: FailurePhase::MidRun })
        ));
        assert_eq!(store.count(CallKind::DeleteApp).await, 0);
        assert_eq!(store.count(CallKind::Associate).await, 2);
        assert_eq!(store.teams_of(&app().app_ref()).await.len(), 2);
    }
}
