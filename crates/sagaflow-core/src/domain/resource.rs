//! Resource references used by the workflows.
//!
//! These are identities and small value types only. The canonical copies live
//! in the remote store behind [`crate::ports::ResourceStore`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an application: the owner namespace plus the app name.
///
/// Ownership transfer changes `owner_name` and keeps `app_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppRef {
    pub owner_name: String,
    pub app_name: String,
}

impl AppRef {
    pub fn new(owner_name: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            owner_name: owner_name.into(),
            app_name: app_name.into(),
        }
    }

    /// The same app, addressed in another owner's namespace.
    pub fn with_owner(&self, owner_name: impl Into<String>) -> Self {
        Self {
            owner_name: owner_name.into(),
            app_name: self.app_name.clone(),
        }
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_name, self.app_name)
    }
}

/// Full app record as returned by `fetch_app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Stable backend identifier; survives ownership transfer.
    pub id: String,
    pub owner_name: String,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl App {
    pub fn new(
        id: impl Into<String>,
        owner_name: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_name: owner_name.into(),
            app_name: app_name.into(),
            display_name: None,
        }
    }

    pub fn app_ref(&self) -> AppRef {
        AppRef::new(self.owner_name.clone(), self.app_name.clone())
    }
}

/// Team identity within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamKey {
    pub organization: String,
    pub team: String,
}

impl TeamKey {
    pub fn new(organization: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            team: team.into(),
        }
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.team)
    }
}

/// Permission level a team holds on an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Viewer,
    Developer,
    Manager,
}

/// Options passed to associate/disassociate.
///
/// Compensation re-associates with exactly the options used to disassociate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationOptions {
    pub permission: Permission,
}

impl AssociationOptions {
    pub fn new(permission: Permission) -> Self {
        Self { permission }
    }
}

/// Relation `(organization, team, app)` with a permission level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamAppAssociation {
    pub team: TeamKey,
    pub app: AppRef,
    pub options: AssociationOptions,
}

impl TeamAppAssociation {
    pub fn new(team: TeamKey, app: AppRef, options: AssociationOptions) -> Self {
        Self { team, app, options }
    }
}

/// One entry of `list_branches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStatus {
    pub name: String,
    pub configured: bool,
}

impl BranchStatus {
    pub fn new(name: impl Into<String>, configured: bool) -> Self {
        Self {
            name: name.into(),
            configured,
        }
    }
}

/// Per-branch CI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchConfiguration {
    pub branch: String,
    #[serde(default)]
    pub trigger: BuildTrigger,
    #[serde(default)]
    pub environment: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolsets: Option<serde_json::Value>,
}

impl BranchConfiguration {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            trigger: BuildTrigger::default(),
            environment: serde_json::Map::new(),
            toolsets: None,
        }
    }

    pub fn with_trigger(mut self, trigger: BuildTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.environment.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTrigger {
    #[default]
    Continuous,
    Manual,
    Scheduled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_owner_keeps_app_name() {
        let app = AppRef::new("alice", "mobile");
        let moved = app.with_owner("acme");
        assert_eq!(moved.owner_name, "acme");
        assert_eq!(moved.app_name, "mobile");
        assert_eq!(moved.to_string(), "acme/mobile");
    }

    #[test]
    fn branch_configuration_defaults_when_fields_missing() {
        let cfg: BranchConfiguration =
            serde_json::from_value(serde_json::json!({"branch": "main"})).unwrap();
        assert_eq!(cfg.trigger, BuildTrigger::Continuous);
        assert!(cfg.environment.is_empty());
        assert!(cfg.toolsets.is_none());
    }
}
