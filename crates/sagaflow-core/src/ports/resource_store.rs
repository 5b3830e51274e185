//! ResourceStore port - リモートリソースへの唯一の書き込み口
//!
//! Workflow はこの trait 越しにのみ app / team / branch を読み書きします。
//! wire format は実装側の責務です。
//!
//! # 実装側が守ること
//! - 成功/失敗は 1 呼び出しにつき 1 回だけ報告する
//! - 既に関連付け済みの team への associate、既に外れた team への
//!   disassociate は安全な no-op か、区別できる conflict エラーにする

use async_trait::async_trait;

use crate::domain::{
    App, AppRef, AssociationOptions, BranchConfiguration, BranchStatus, StoreError, TeamKey,
};

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn associate(
        &self,
        team: &TeamKey,
        app: &AppRef,
        options: &AssociationOptions,
    ) -> Result<(), StoreError>;

    async fn disassociate(
        &self,
        team: &TeamKey,
        app: &AppRef,
        options: &AssociationOptions,
    ) -> Result<(), StoreError>;

    async fn delete_app(&self, app: &AppRef) -> Result<(), StoreError>;

    async fn transfer_ownership(
        &self,
        app: &AppRef,
        destination_owner_name: &str,
    ) -> Result<(), StoreError>;

    async fn list_branches(&self, app: &AppRef) -> Result<Vec<BranchStatus>, StoreError>;

    async fn get_branch_configuration(
        &self,
        app: &AppRef,
        branch_name: &str,
    ) -> Result<BranchConfiguration, StoreError>;

    async fn fetch_app(&self, owner_name: &str, app_name: &str) -> Result<App, StoreError>;
}
