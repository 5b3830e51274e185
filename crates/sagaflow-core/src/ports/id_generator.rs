//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース

use std::sync::Arc;

use crate::domain::ids::{RunId, StepId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は run / step の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（並列ステップから呼ばれる）
pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;

    fn generate_step_id(&self) -> StepId;
}

/// UlidGenerator は Clock の時刻をタイムスタンプ部に使う
///
/// テスト時に FixedClock を渡せば timestamp 部分が固定されます。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_run_id(&self) -> RunId {
        RunId::from(self.next())
    }

    fn generate_step_id(&self) -> StepId {
        StepId::from(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        let id1 = id_gen.generate_step_id();
        let id2 = id_gen.generate_step_id();

        assert_ne!(id1, id2);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_pins_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(Arc::new(FixedClock::new(fixed_time)));

        let id1 = id_gen.generate_run_id();
        let id2 = id_gen.generate_run_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
