//! 输出到 tracing 的写入器
//!
//! 记录以摘要行作为消息，完整上下文作为 `context` 字段、所属通道作为
//! `channel` 字段输出。
//! 实际落地位置取决于宿主安装的 subscriber。

use crate::config::JsonOptions;
use crate::core::record::LogRecord;
use crate::sinks::traits::{RecordWriter, SinkResult};
use async_trait::async_trait;
use tracing::Level;

#[derive(Debug, Clone)]
pub struct TracingRecordWriter {
    level: Level,
    channel: String,
    json: JsonOptions,
}

impl TracingRecordWriter {
    pub fn new(level: Level, channel: impl Into<String>) -> Self {
        Self {
            level,
            channel: channel.into(),
            json: JsonOptions::default(),
        }
    }

    pub fn with_json_options(mut self, json: JsonOptions) -> Self {
        self.json = json;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl RecordWriter for TracingRecordWriter {
    async fn write(&self, record: &LogRecord) -> SinkResult<()> {
        let context = record.to_json(&self.json)?;
        let summary = record.summary();
        let channel = self.channel.as_str();
        let request_id = record.request_id.as_str();

        // tracing 宏要求级别为常量
        match self.level {
            Level::ERROR => tracing::error!(channel, request_id, context = %context, "{}", summary),
            Level::WARN => tracing::warn!(channel, request_id, context = %context, "{}", summary),
            Level::INFO => tracing::info!(channel, request_id, context = %context, "{}", summary),
            Level::DEBUG => tracing::debug!(channel, request_id, context = %context, "{}", summary),
            _ => tracing::trace!(channel, request_id, context = %context, "{}", summary),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
