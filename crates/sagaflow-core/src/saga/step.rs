//! Saga step abstraction.
//!
//! A step is a forward action with an optional compensating action. Steps
//! whose forward action has no externally visible side effect (reads,
//! client-side rehydration) simply return `None` from `compensation()`.

use async_trait::async_trait;

use crate::domain::StoreError;

/// A unit of forward work inside a saga.
///
/// # 使用例
/// ```ignore
/// struct DeleteApp { store: Arc<S>, app: AppRef }
///
/// #[async_trait]
/// impl<S: ResourceStore> SagaStep for DeleteApp {
///     type Output = ();
///     fn name(&self) -> String { format!("delete {}", self.app) }
///     async fn forward(&self) -> Result<(), StoreError> {
///         self.store.delete_app(&self.app).await
///     }
/// }
/// ```
#[async_trait]
pub trait SagaStep: Send + Sync {
    type Output: Send;

    fn name(&self) -> String;

    async fn forward(&self) -> Result<Self::Output, StoreError>;

    /// Inverse of a committed forward action.
    ///
    /// Only called after `forward` succeeded, so implementations can capture
    /// exactly the parameters the forward call used.
    fn compensation(&self) -> Option<Box<dyn Compensation>> {
        None
    }

    /// A step whose success this saga cannot undo.
    ///
    /// Failures after a commit point are reported as
    /// [`FailurePhase::PostCommit`](crate::domain::FailurePhase::PostCommit).
    fn is_commit_point(&self) -> bool {
        false
    }
}

/// Object-safe compensating action, stored by the executor until the run ends.
#[async_trait]
pub trait Compensation: Send + Sync {
    fn name(&self) -> String;

    async fn compensate(&self) -> Result<(), StoreError>;
}
