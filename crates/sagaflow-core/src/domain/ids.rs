//! Workflow identifiers (strongly-typed IDs).
//!
//! Run と Step の ID は ULID ベースで、Phantom type パターンにより
//! `RunId` と `StepId` をコンパイル時に区別します。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 生成順に並ぶので、ログ上で run の順序を追いやすい
//! - **分散生成可能**: 調整なしで生成できる
//! - **UUID互換**: 128-bit

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"run-", "step-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed identifier.
///
/// `T` is a zero-sized marker, so `Id<Run>` and `Id<Step>` cannot be mixed.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// WorkflowRun のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// WorkflowStep のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {}

impl IdMarker for Step {
    fn prefix() -> &'static str {
        "step-"
    }
}

/// Identifier of a workflow run (one confirmed delete/transfer action).
pub type RunId = Id<Run>;

/// Identifier of a single forward or compensating step within a run.
pub type StepId = Id<Step>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_their_prefix() {
        let run = RunId::from_ulid(Ulid::new());
        let step = StepId::from_ulid(Ulid::new());

        assert!(run.to_string().starts_with("run-"));
        assert!(step.to_string().starts_with("step-"));

        // let _: RunId = step; // <- does not compile
    }

    #[test]
    fn ids_are_sortable_by_creation_time() {
        let id1 = StepId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = StepId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn phantom_marker_is_zero_sized() {
        use std::mem::size_of;
        assert_eq!(size_of::<RunId>(), size_of::<Ulid>());
        assert_eq!(size_of::<StepId>(), size_of::<Ulid>());
    }
}
