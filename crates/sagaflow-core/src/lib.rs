//! sagaflow-core
//!
//! Compensable multi-step workflows over a remote resource store.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, resource, step, run, outcome, errors, events）
//! - **ports**: 抽象化レイヤー（ResourceStore, EventSink, Clock, IdGenerator）
//! - **saga**: SagaStep / Compensation と実行器（Sequential, ParallelBarrier）
//! - **workflows**: アプリ削除・アプリ移管
//! - **app**: Console と ConsoleBuilder
//! - **impls**: 実装（InMemoryResourceStore など開発用）
//! - **config**: WorkflowConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod saga;
pub mod workflows;
