//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。Workflow が外部（リモート API, UI,
//! 時刻, ID 採番）に触れるのはここで定義した trait 越しのみです。
//!
//! # 設計原則
//! - リモートの canonical state は ResourceStore の向こう側にある
//! - Workflow 自身はグローバルな可変状態を持たない

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod resource_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::resource_store::ResourceStore;
