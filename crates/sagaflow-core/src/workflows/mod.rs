//! Workflows - サガ実行器の上に組んだ具体的な業務フロー
//!
//! - **AppDeletionWorkflow**: チーム関連付けを外してからアプリを削除
//! - **AppTransferWorkflow**: オーナー移管後に CI 状態を再構築

pub mod ci_state;
pub mod deletion;
pub mod messages;
pub mod transfer;

pub use self::ci_state::RehydratedCiState;
pub use self::deletion::{AppDeletionWorkflow, DeletionReport};
pub use self::transfer::{AppTransferWorkflow, TransferReport, TransferResult, TransferState};
