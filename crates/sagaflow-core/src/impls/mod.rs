//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryResourceStore**: 故障・遅延注入つきの開発用ストア
//! - **TracingEventSink**: イベントをログに出す
//! - **RecordingEventSink**: イベントを貯める（テスト用）
//!
//! 本番の HTTP クライアント実装は別クレートに置く想定です。

pub mod event_sink;
pub mod inmem_store;

pub use self::event_sink::{RecordingEventSink, TracingEventSink};
pub use self::inmem_store::{CallEvent, CallKind, Fault, InMemoryResourceStore, StoreCall};
