//! ConsoleBuilder - Console の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use crate::config::{ConfigError, WorkflowConfig};
use crate::impls::TracingEventSink;
use crate::ports::{Clock, EventSink, IdGenerator, ResourceStore, SystemClock, UlidGenerator};
use crate::saga::SagaContext;

use super::console::Console;

/// ConsoleBuilder は Console を構築
///
/// # 使用例
/// ```ignore
/// let console = ConsoleBuilder::new()
///     .store(Arc::new(InMemoryResourceStore::new()))
///     .config(WorkflowConfig::from_file("sagaflow.json")?)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - store は必須。未設定なら BuildError::MissingStore
/// - config は build() 時に validate される
/// - 省略した port は既定実装（SystemClock, UlidGenerator, TracingEventSink）
pub struct ConsoleBuilder<S> {
    store: Option<Arc<S>>,
    sink: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: WorkflowConfig,
}

/// BuildError は Console 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No resource store configured. Call .store(...) before .build().")]
    MissingStore,

    #[error("Invalid workflow configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl<S: ResourceStore + 'static> ConsoleBuilder<S> {
    pub fn new() -> Self {
        Self {
            store: None,
            sink: None,
            clock: None,
            ids: None,
            config: WorkflowConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// ConsoleBuilder を検証して Console を生成
    pub fn build(self) -> Result<Console<S>, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingEventSink));
        let saga = SagaContext::new(ids, clock)
            .with_compensation_timeout(self.config.compensation_timeout());

        Ok(Console::new(store, sink, saga, self.config))
    }
}

impl<S: ResourceStore + 'static> Default for ConsoleBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{App, AppRef};
    use crate::impls::{InMemoryResourceStore, RecordingEventSink};
    use crate::ports::FixedClock;
    use crate::saga::CancelToken;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_build_success_with_defaults() {
        let console = ConsoleBuilder::new()
            .store(Arc::new(InMemoryResourceStore::new()))
            .build();
        assert!(console.is_ok());
    }

    #[test]
    fn test_build_missing_store() {
        let console = ConsoleBuilder::<InMemoryResourceStore>::new().build();
        assert!(matches!(console, Err(BuildError::MissingStore)));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = WorkflowConfig {
            not_configured_error_code: "  ".to_string(),
            ..WorkflowConfig::default()
        };
        let console = ConsoleBuilder::new()
            .store(Arc::new(InMemoryResourceStore::new()))
            .config(config)
            .build();
        assert!(matches!(
            console,
            Err(BuildError::InvalidConfig(ConfigError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn test_injected_clock_stamps_runs() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let app = App::new("app-a", "alice", "A");
        let console = ConsoleBuilder::new()
            .store(Arc::new(InMemoryResourceStore::new().with_app(app.clone())))
            .event_sink(Arc::new(RecordingEventSink::new()))
            .clock(Arc::new(FixedClock::new(now)))
            .build()
            .unwrap();

        let run = console
            .delete_app(&AppRef::new("alice", "A"), &[], CancelToken::new())
            .await
            .unwrap();

        assert_eq!(run.started_at, now);
        assert_eq!(run.finished_at, Some(now));
        assert_eq!(run.id.as_ulid().timestamp_ms(), now.timestamp_millis() as u64);
    }
}
