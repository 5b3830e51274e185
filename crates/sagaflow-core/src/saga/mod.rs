//! Saga - 補償付きステップの実行基盤
//!
//! - **SagaStep / Compensation**: forward と補償アクションの定義
//! - **Saga**: 1 run 分の実行器（Sequential / ParallelBarrier）
//! - **CancelToken**: 協調的キャンセル

pub mod cancel;
pub mod executor;
pub mod step;

pub use self::cancel::CancelToken;
pub use self::executor::{Mode, Saga, SagaContext};
pub use self::step::{Compensation, SagaStep};
