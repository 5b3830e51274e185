//! InMemoryResourceStore - 開発・テスト用のリソースストア
//!
//! # 学習ポイント
//! - tokio::sync::Mutex で状態を保護（ロックを跨いで await しない）
//! - 故障注入（call 種別 / team / n 回目）と遅延注入
//! - 発行・解決の順序付きログ（バリアの静止性をテストで検証するため）

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    App, AppRef, AssociationOptions, BranchConfiguration, BranchStatus, NOT_CONFIGURED_FOR_BUILD,
    StoreError, TeamKey,
};
use crate::ports::ResourceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Associate,
    Disassociate,
    DeleteApp,
    TransferOwnership,
    ListBranches,
    GetBranchConfiguration,
    FetchApp,
}

/// One call as the store saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Associate {
        team: TeamKey,
        app: AppRef,
        options: AssociationOptions,
    },
    Disassociate {
        team: TeamKey,
        app: AppRef,
        options: AssociationOptions,
    },
    DeleteApp {
        app: AppRef,
    },
    TransferOwnership {
        app: AppRef,
        destination: String,
    },
    ListBranches {
        app: AppRef,
    },
    GetBranchConfiguration {
        app: AppRef,
        branch: String,
    },
    FetchApp {
        owner_name: String,
        app_name: String,
    },
}

impl StoreCall {
    pub fn kind(&self) -> CallKind {
        match self {
            StoreCall::Associate { .. } => CallKind::Associate,
            StoreCall::Disassociate { .. } => CallKind::Disassociate,
            StoreCall::DeleteApp { .. } => CallKind::DeleteApp,
            StoreCall::TransferOwnership { .. } => CallKind::TransferOwnership,
            StoreCall::ListBranches { .. } => CallKind::ListBranches,
            StoreCall::GetBranchConfiguration { .. } => CallKind::GetBranchConfiguration,
            StoreCall::FetchApp { .. } => CallKind::FetchApp,
        }
    }

    pub fn team(&self) -> Option<&TeamKey> {
        match self {
            StoreCall::Associate { team, .. } | StoreCall::Disassociate { team, .. } => Some(team),
            _ => None,
        }
    }
}

/// Ordered log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Issued(StoreCall),
    Resolved { call: StoreCall, ok: bool },
}

/// Fail matching calls with a fixed error.
#[derive(Debug, Clone)]
pub struct Fault {
    kind: CallKind,
    team: Option<TeamKey>,
    /// 1-based occurrence to fail; `None` fails every match.
    nth: Option<usize>,
    error: StoreError,
    seen: usize,
}

impl Fault {
    pub fn on(kind: CallKind, error: StoreError) -> Self {
        Self {
            kind,
            team: None,
            nth: None,
            error,
            seen: 0,
        }
    }

    pub fn for_team(mut self, team: TeamKey) -> Self {
        self.team = Some(team);
        self
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = Some(nth);
        self
    }

    fn matches(&self, call: &StoreCall) -> bool {
        call.kind() == self.kind
            && match &self.team {
                Some(team) => call.team() == Some(team),
                None => true,
            }
    }
}

#[derive(Default)]
struct StoreState {
    apps: HashMap<AppRef, App>,
    /// (team, app id) -> options
    associations: HashMap<(TeamKey, String), AssociationOptions>,
    /// app id -> branches; absent means the app was never set up for builds
    branches: HashMap<String, Vec<BranchStatus>>,
    /// (app id, branch) -> configuration
    branch_configs: HashMap<(String, String), BranchConfiguration>,
    faults: Vec<Fault>,
    latency: HashMap<(CallKind, Option<TeamKey>), Duration>,
    log: Vec<CallEvent>,
}

impl StoreState {
    fn app(&self, app: &AppRef) -> Result<&App, StoreError> {
        self.apps
            .get(app)
            .ok_or_else(|| StoreError::not_found(format!("app {app} not found")))
    }

    fn app_id(&self, app: &AppRef) -> Result<String, StoreError> {
        self.app(app).map(|a| a.id.clone())
    }

    fn latency_for(&self, call: &StoreCall) -> Option<Duration> {
        let kind = call.kind();
        call.team()
            .and_then(|team| self.latency.get(&(kind, Some(team.clone()))))
            .or_else(|| self.latency.get(&(kind, None)))
            .copied()
    }

    fn take_fault(&mut self, call: &StoreCall) -> Option<StoreError> {
        for fault in self.faults.iter_mut().filter(|f| f.matches(call)) {
            fault.seen += 1;
            match fault.nth {
                Some(n) if n == fault.seen => return Some(fault.error.clone()),
                None => return Some(fault.error.clone()),
                _ => {}
            }
        }
        None
    }
}

/// InMemoryResourceStore は開発用のストア
///
/// # 使用例
/// ```ignore
/// let store = InMemoryResourceStore::new()
///     .with_app(App::new("1", "alice", "mobile"))
///     .with_fault(Fault::on(CallKind::DeleteApp, StoreError::forbidden("nope")));
/// ```
#[derive(Default)]
pub struct InMemoryResourceStore {
    state: Mutex<StoreState>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, app: App) -> Self {
        self.state.get_mut().apps.insert(app.app_ref(), app);
        self
    }

    pub fn with_association(
        mut self,
        team: TeamKey,
        app: &AppRef,
        options: AssociationOptions,
    ) -> Self {
        let state = self.state.get_mut();
        if let Ok(id) = state.app_id(app) {
            state.associations.insert((team, id), options);
        }
        self
    }

    pub fn with_branches(mut self, app: &AppRef, branches: Vec<BranchStatus>) -> Self {
        let state = self.state.get_mut();
        if let Ok(id) = state.app_id(app) {
            state.branches.insert(id, branches);
        }
        self
    }

    pub fn with_branch_configuration(mut self, app: &AppRef, config: BranchConfiguration) -> Self {
        let state = self.state.get_mut();
        if let Ok(id) = state.app_id(app) {
            state
                .branch_configs
                .insert((id, config.branch.clone()), config);
        }
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.state.get_mut().faults.push(fault);
        self
    }

    pub fn with_latency(mut self, kind: CallKind, team: Option<TeamKey>, delay: Duration) -> Self {
        self.state.get_mut().latency.insert((kind, team), delay);
        self
    }

    /// Issued and resolved calls, in order.
    pub async fn events(&self) -> Vec<CallEvent> {
        self.state.lock().await.log.clone()
    }

    /// Issued calls only, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state
            .lock()
            .await
            .log
            .iter()
            .filter_map(|e| match e {
                CallEvent::Issued(call) => Some(call.clone()),
                CallEvent::Resolved { .. } => None,
            })
            .collect()
    }

    pub async fn count(&self, kind: CallKind) -> usize {
        self.calls().await.iter().filter(|c| c.kind() == kind).count()
    }

    pub async fn app(&self, app: &AppRef) -> Option<App> {
        self.state.lock().await.apps.get(app).cloned()
    }

    /// Teams currently associated with the app.
    pub async fn teams_of(&self, app: &AppRef) -> Vec<(TeamKey, AssociationOptions)> {
        let state = self.state.lock().await;
        let Ok(id) = state.app_id(app) else {
            return Vec::new();
        };
        let mut teams: Vec<_> = state
            .associations
            .iter()
            .filter(|((_, app_id), _)| app_id.as_str() == id.as_str())
            .map(|((team, _), options)| (team.clone(), options.clone()))
            .collect();
        teams.sort_by(|a, b| a.0.cmp(&b.0));
        teams
    }

    /// Log the call, apply latency and faults, then run `op` on the state.
    async fn call<T, F>(&self, call: StoreCall, op: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut StoreState) -> Result<T, StoreError> + Send,
    {
        let (delay, fault) = {
            let mut state = self.state.lock().await;
            state.log.push(CallEvent::Issued(call.clone()));
            (state.latency_for(&call), state.take_fault(&call))
        }; // Lock released here

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        let result = match fault {
            Some(err) => Err(err),
            None => op(&mut state),
        };
        state.log.push(CallEvent::Resolved {
            call,
            ok: result.is_ok(),
        });
        result
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn associate(
        &self,
        team: &TeamKey,
        app: &AppRef,
        options: &AssociationOptions,
    ) -> Result<(), StoreError> {
        let call = StoreCall::Associate {
            team: team.clone(),
            app: app.clone(),
            options: options.clone(),
        };
        self.call(call, |state| {
            let id = state.app_id(app)?;
            // Re-associating an associated team just refreshes its options.
            state
                .associations
                .insert((team.clone(), id), options.clone());
            Ok(())
        })
        .await
    }

    async fn disassociate(
        &self,
        team: &TeamKey,
        app: &AppRef,
        options: &AssociationOptions,
    ) -> Result<(), StoreError> {
        let call = StoreCall::Disassociate {
            team: team.clone(),
            app: app.clone(),
            options: options.clone(),
        };
        self.call(call, |state| {
            let id = state.app_id(app)?;
            state.associations.remove(&(team.clone(), id));
            Ok(())
        })
        .await
    }

    async fn delete_app(&self, app: &AppRef) -> Result<(), StoreError> {
        let call = StoreCall::DeleteApp { app: app.clone() };
        self.call(call, |state| {
            let id = state.app_id(app)?;
            state.apps.remove(app);
            state.associations.retain(|(_, app_id), _| *app_id != id);
            state.branches.remove(&id);
            state.branch_configs.retain(|(app_id, _), _| *app_id != id);
            Ok(())
        })
        .await
    }

    async fn transfer_ownership(
        &self,
        app: &AppRef,
        destination_owner_name: &str,
    ) -> Result<(), StoreError> {
        let call = StoreCall::TransferOwnership {
            app: app.clone(),
            destination: destination_owner_name.to_string(),
        };
        self.call(call, |state| {
            state.app(app)?;
            let target = app.with_owner(destination_owner_name);
            if state.apps.contains_key(&target) {
                return Err(StoreError::conflict(format!("{target} already exists")));
            }
            if let Some(mut moved) = state.apps.remove(app) {
                moved.owner_name = destination_owner_name.to_string();
                state.apps.insert(target, moved);
            }
            Ok(())
        })
        .await
    }

    async fn list_branches(&self, app: &AppRef) -> Result<Vec<BranchStatus>, StoreError> {
        let call = StoreCall::ListBranches { app: app.clone() };
        self.call(call, |state| {
            let id = state.app_id(app)?;
            state.branches.get(&id).cloned().ok_or_else(|| {
                StoreError::not_found(format!("{app} is not configured for build"))
                    .with_code(NOT_CONFIGURED_FOR_BUILD)
            })
        })
        .await
    }

    async fn get_branch_configuration(
        &self,
        app: &AppRef,
        branch_name: &str,
    ) -> Result<BranchConfiguration, StoreError> {
        let call = StoreCall::GetBranchConfiguration {
            app: app.clone(),
            branch: branch_name.to_string(),
        };
        self.call(call, |state| {
            let id = state.app_id(app)?;
            state
                .branch_configs
                .get(&(id, branch_name.to_string()))
                .cloned()
                .ok_or_else(|| {
                    StoreError::not_found(format!("branch {branch_name} of {app} not configured"))
                })
        })
        .await
    }

    async fn fetch_app(&self, owner_name: &str, app_name: &str) -> Result<App, StoreError> {
        let call = StoreCall::FetchApp {
            owner_name: owner_name.to_string(),
            app_name: app_name.to_string(),
        };
        self.call(call, |state| {
            state
                .app(&AppRef::new(owner_name, app_name))
                .cloned()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Permission;

    fn app() -> App {
        App::new("app-1", "alice", "mobile")
    }

    fn dev() -> AssociationOptions {
        AssociationOptions::new(Permission::Developer)
    }

    #[tokio::test]
    async fn associate_and_disassociate_are_idempotent() {
        let a = app().app_ref();
        let team = TeamKey::new("acme", "ios");
        let store = InMemoryResourceStore::new().with_app(app());

        store.associate(&team, &a, &dev()).await.unwrap();
        store.associate(&team, &a, &dev()).await.unwrap();
        assert_eq!(store.teams_of(&a).await.len(), 1);

        store.disassociate(&team, &a, &dev()).await.unwrap();
        store.disassociate(&team, &a, &dev()).await.unwrap();
        assert!(store.teams_of(&a).await.is_empty());
    }

    #[tokio::test]
    async fn transfer_moves_app_and_keeps_branch_data() {
        let a = app().app_ref();
        let store = InMemoryResourceStore::new()
            .with_app(app())
            .with_branches(&a, vec![BranchStatus::new("main", true)]);

        store.transfer_ownership(&a, "acme").await.unwrap();

        assert!(store.app(&a).await.is_none());
        let moved = store.fetch_app("acme", "mobile").await.unwrap();
        assert_eq!(moved.id, "app-1");
        let branches = store.list_branches(&a.with_owner("acme")).await.unwrap();
        assert_eq!(branches.len(), 1);
    }

    #[tokio::test]
    async fn transfer_onto_existing_name_conflicts() {
        let store = InMemoryResourceStore::new()
            .with_app(app())
            .with_app(App::new("app-2", "acme", "mobile"));

        let err = store
            .transfer_ownership(&app().app_ref(), "acme")
            .await
            .unwrap_err();
        assert_eq!(err.status, 409);
    }

    #[tokio::test]
    async fn unconfigured_app_reports_machine_readable_code() {
        let store = InMemoryResourceStore::new().with_app(app());
        let err = store.list_branches(&app().app_ref()).await.unwrap_err();
        assert!(err.has_code(NOT_CONFIGURED_FOR_BUILD));
    }

    #[tokio::test]
    async fn nth_fault_fails_only_that_occurrence() {
        let store = InMemoryResourceStore::new()
            .with_app(app())
            .with_fault(Fault::on(CallKind::FetchApp, StoreError::new(500, "down")).nth(2));

        assert!(store.fetch_app("alice", "mobile").await.is_ok());
        assert!(store.fetch_app("alice", "mobile").await.is_err());
        assert!(store.fetch_app("alice", "mobile").await.is_ok());
        assert_eq!(store.count(CallKind::FetchApp).await, 3);
    }

    #[tokio::test]
    async fn team_fault_leaves_other_teams_alone() {
        let a = app().app_ref();
        let t1 = TeamKey::new("acme", "t1");
        let t2 = TeamKey::new("acme", "t2");
        let store = InMemoryResourceStore::new()
            .with_app(app())
            .with_association(t1.clone(), &a, dev())
            .with_association(t2.clone(), &a, dev())
            .with_fault(
                Fault::on(CallKind::Disassociate, StoreError::new(500, "down")).for_team(t2.clone()),
            );

        assert!(store.disassociate(&t1, &a, &dev()).await.is_ok());
        assert!(store.disassociate(&t2, &a, &dev()).await.is_err());

        let events = store.events().await;
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[3], CallEvent::Resolved { ok: false, .. }));
        assert_eq!(store.teams_of(&a).await, vec![(t2, dev())]);
    }
}
