//! 投递策略
//!
//! 决定记录走队列还是同步写入，并在失败时按 队列 → 同步 → 紧急日志 的顺序降级。
//! 每条路径最多尝试一次，策略本身从不返回错误。

use crate::config::{LogMode, ThinkLogConfig};
use crate::core::record::LogRecord;
use crate::diagnostics::{init_diagnostics, Diagnostics};
use crate::sinks::traits::{LogSink, SinkError};
use std::fmt;
use std::sync::Arc;

/// 一次投递的最终结果，仅用于测试与诊断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 首选路径成功，携带路径名
    Delivered(String),
    /// 队列失败后同步写入成功，携带路径名与队列失败原因
    FellBackTo(String, String),
    /// 同步写入失败，已写入紧急日志
    EmergencyWritten(String),
    /// 紧急日志也写入失败
    Lost(String),
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered(_) | DispatchOutcome::FellBackTo(..))
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Delivered(path) => write!(f, "delivered via {}", path),
            DispatchOutcome::FellBackTo(path, reason) => {
                write!(f, "fell back to {} ({})", path, reason)
            }
            DispatchOutcome::EmergencyWritten(reason) => {
                write!(f, "written to emergency log ({})", reason)
            }
            DispatchOutcome::Lost(reason) => write!(f, "lost ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    mode: LogMode,
    diagnostics: Arc<Diagnostics>,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::new(LogMode::default())
    }
}

impl DispatchPolicy {
    /// 使用全局诊断实例
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            diagnostics: init_diagnostics(),
        }
    }

    pub fn from_config(config: &ThinkLogConfig) -> Self {
        Self::new(config.mode)
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// 仅当配置为异步且 sink 在构造时注册了队列时走队列
    pub fn should_async(&self, sink: &dyn LogSink) -> bool {
        self.mode == LogMode::Async && sink.has_queue()
    }

    pub async fn dispatch(&self, record: &LogRecord, sink: &dyn LogSink) -> DispatchOutcome {
        if !self.should_async(sink) {
            let path = format!("{}:sync", sink.name());
            return match sink.write_sync(record).await {
                Ok(()) => {
                    self.diagnostics.increment_delivered_sync();
                    DispatchOutcome::Delivered(path)
                }
                Err(e) => self.emergency(record, sink, e).await,
            };
        }

        let reason = match sink.dispatch_async(record).await {
            Ok(()) => {
                self.diagnostics.increment_delivered_async();
                return DispatchOutcome::Delivered(format!("{}:async", sink.name()));
            }
            Err(e) => e.to_string(),
        };

        tracing::error!(
            request_id = %record.request_id,
            "Async log dispatch failed: {}",
            reason
        );
        self.diagnostics.increment_async_fallbacks();

        match sink.write_sync(record).await {
            Ok(()) => {
                self.diagnostics.increment_delivered_sync();
                DispatchOutcome::FellBackTo(format!("{}:sync", sink.name()), reason)
            }
            Err(e) => self.emergency(record, sink, e).await,
        }
    }

    async fn emergency(
        &self,
        record: &LogRecord,
        sink: &dyn LogSink,
        error: SinkError,
    ) -> DispatchOutcome {
        self.diagnostics.increment_sync_failures();
        let reason = error.to_string();
        tracing::warn!(
            request_id = %record.request_id,
            error = %reason,
            "log write failed, falling back to emergency log"
        );

        match sink.emergency_write(record, &error).await {
            Ok(()) => {
                self.diagnostics.increment_emergency_writes();
                DispatchOutcome::EmergencyWritten(reason)
            }
            Err(_) => {
                self.diagnostics.increment_emergency_failures();
                DispatchOutcome::Lost(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::RecordCategory;
    use crate::sinks::emergency::EmergencyWriteError;
    use crate::sinks::traits::{DispatchError, DispatchResult, SinkMetadata, SinkResult};
    use async_trait::async_trait;
    use std::error::Error as StdError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 可配置失败点并统计调用次数的 sink
    #[derive(Debug, Default)]
    struct MockSink {
        has_queue: bool,
        fail_async: bool,
        fail_sync: bool,
        fail_emergency: bool,
        async_calls: AtomicUsize,
        sync_calls: AtomicUsize,
        emergency_calls: AtomicUsize,
    }

    impl MockSink {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.async_calls.load(Ordering::SeqCst),
                self.sync_calls.load(Ordering::SeqCst),
                self.emergency_calls.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl LogSink for MockSink {
        async fn write_sync(&self, _record: &LogRecord) -> SinkResult<()> {
            self.sync_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_sync {
                Err(SinkError::Generic("disk full".to_string()))
            } else {
                Ok(())
            }
        }

        async fn dispatch_async(&self, _record: &LogRecord) -> DispatchResult<()> {
            self.async_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_async {
                Err(DispatchError::Full("default".to_string()))
            } else {
                Ok(())
            }
        }

        async fn emergency_write(
            &self,
            _record: &LogRecord,
            _error: &(dyn StdError + Send + Sync),
        ) -> Result<(), EmergencyWriteError> {
            self.emergency_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_emergency {
                Err(EmergencyWriteError::Timeout(Duration::from_millis(1)))
            } else {
                Ok(())
            }
        }

        fn has_queue(&self) -> bool {
            self.has_queue
        }

        fn name(&self) -> &'static str {
            "mock"
        }

        fn metadata(&self) -> SinkMetadata {
            SinkMetadata::new("mock", "mock")
        }
    }

    fn policy(mode: LogMode) -> DispatchPolicy {
        DispatchPolicy::new(mode).with_diagnostics(Arc::new(Diagnostics::new()))
    }

    fn record() -> LogRecord {
        LogRecord::new("rid", RecordCategory::ModelChange)
    }

    #[tokio::test]
    async fn test_async_delivery() {
        let sink = MockSink {
            has_queue: true,
            ..Default::default()
        };
        let policy = policy(LogMode::Async);

        let outcome = policy.dispatch(&record(), &sink).await;
        assert_eq!(outcome, DispatchOutcome::Delivered("mock:async".to_string()));
        assert_eq!(sink.counts(), (1, 0, 0));
        assert_eq!(policy.diagnostics().snapshot().delivered_async, 1);
    }

    #[tokio::test]
    async fn test_async_mode_without_queue_goes_sync() {
        let sink = MockSink::default();
        let policy = policy(LogMode::Async);

        assert!(!policy.should_async(&sink));
        let outcome = policy.dispatch(&record(), &sink).await;
        assert_eq!(outcome, DispatchOutcome::Delivered("mock:sync".to_string()));
        assert_eq!(sink.counts(), (0, 1, 0));
    }

    #[tokio::test]
    async fn test_sync_mode_ignores_queue() {
        let sink = MockSink {
            has_queue: true,
            ..Default::default()
        };
        let outcome = policy(LogMode::Sync).dispatch(&record(), &sink).await;
        assert_eq!(outcome, DispatchOutcome::Delivered("mock:sync".to_string()));
        assert_eq!(sink.counts(), (0, 1, 0));
    }

    #[tokio::test]
    async fn test_async_failure_falls_back_once() {
        let sink = MockSink {
            has_queue: true,
            fail_async: true,
            ..Default::default()
        };
        let policy = policy(LogMode::Async);

        let outcome = policy.dispatch(&record(), &sink).await;
        assert_eq!(
            outcome,
            DispatchOutcome::FellBackTo(
                "mock:sync".to_string(),
                "Queue 'default' is full".to_string()
            )
        );
        assert!(outcome.is_delivered());
        assert_eq!(sink.counts(), (1, 1, 0));

        let snapshot = policy.diagnostics().snapshot();
        assert_eq!(snapshot.async_fallbacks, 1);
        assert_eq!(snapshot.delivered_sync, 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_writes_emergency_once() {
        let sink = MockSink {
            has_queue: true,
            fail_async: true,
            fail_sync: true,
            ..Default::default()
        };
        let policy = policy(LogMode::Async);

        let outcome = policy.dispatch(&record(), &sink).await;
        assert_eq!(
            outcome,
            DispatchOutcome::EmergencyWritten("Generic error: disk full".to_string())
        );
        assert_eq!(sink.counts(), (1, 1, 1));

        let snapshot = policy.diagnostics().snapshot();
        assert_eq!(snapshot.sync_failures, 1);
        assert_eq!(snapshot.emergency_writes, 1);
    }

    #[tokio::test]
    async fn test_sync_failure_writes_emergency_once() {
        let sink = MockSink {
            fail_sync: true,
            ..Default::default()
        };
        let outcome = policy(LogMode::Sync).dispatch(&record(), &sink).await;
        assert!(matches!(outcome, DispatchOutcome::EmergencyWritten(_)));
        assert_eq!(sink.counts(), (0, 1, 1));
    }

    #[tokio::test]
    async fn test_everything_fails_is_lost_not_raised() {
        let sink = MockSink {
            has_queue: true,
            fail_async: true,
            fail_sync: true,
            fail_emergency: true,
            ..Default::default()
        };
        let policy = policy(LogMode::Async);

        let outcome = policy.dispatch(&record(), &sink).await;
        assert!(matches!(outcome, DispatchOutcome::Lost(_)));
        assert!(!outcome.is_delivered());
        assert_eq!(sink.counts(), (1, 1, 1));
        assert_eq!(policy.diagnostics().snapshot().emergency_failures, 1);
    }

    #[test]
    fn test_dispatch_without_runtime() {
        let sink = MockSink::default();
        let policy = policy(LogMode::Sync);
        let outcome = tokio_test::block_on(policy.dispatch(&record(), &sink));
        assert!(outcome.is_delivered());
        assert_eq!(sink.counts(), (0, 1, 0));
    }

    #[test]
    fn test_from_config() {
        let config = ThinkLogConfig {
            mode: LogMode::Sync,
            ..Default::default()
        };
        assert_eq!(DispatchPolicy::from_config(&config).mode(), LogMode::Sync);
        assert_eq!(DispatchPolicy::default().mode(), LogMode::Async);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = DispatchOutcome::FellBackTo("file:sync".into(), "queue closed".into());
        assert_eq!(outcome.to_string(), "fell back to file:sync (queue closed)");
    }
}
