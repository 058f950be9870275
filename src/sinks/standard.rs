//! 标准 Sink
//!
//! 组合一个主写入器、一个可选的宿主队列和紧急日志写入器，
//! 实现 [`LogSink`] 的三项能力。

use crate::config::{SinkDestination, ThinkLogConfig};
use crate::core::record::LogRecord;
use crate::error::{Result, ThinkLogError};
use crate::sinks::emergency::{EmergencyWriteError, EmergencyWriter};
use crate::sinks::file::FileRecordWriter;
use crate::sinks::tracing_writer::TracingRecordWriter;
use crate::sinks::traits::{
    DispatchError, DispatchResult, LogQueue, LogSink, QueuedRecord, RecordWriter, SinkMetadata,
    SinkResult,
};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StandardSink {
    writer: Arc<dyn RecordWriter>,
    queue: Option<Arc<dyn LogQueue>>,
    queue_name: String,
    /// 注册队列时读取一次，之后不再探测
    queue_available: bool,
    emergency: EmergencyWriter,
}

impl StandardSink {
    pub fn new(writer: Arc<dyn RecordWriter>, emergency: EmergencyWriter) -> Self {
        Self {
            writer,
            queue: None,
            queue_name: ThinkLogConfig::default().queue_name,
            queue_available: false,
            emergency,
        }
    }

    /// 注册宿主队列，任务投递到 `queue_name`
    pub fn with_queue(mut self, queue: Arc<dyn LogQueue>, queue_name: impl Into<String>) -> Self {
        self.queue_available = queue.is_available();
        self.queue_name = queue_name.into();
        self.queue = Some(queue);
        self
    }

    /// 按配置构建主写入器与紧急写入器
    pub fn from_config(config: &ThinkLogConfig, queue: Option<Arc<dyn LogQueue>>) -> Result<Self> {
        let writer = build_writer(config)?;
        let sink = Self::new(writer, EmergencyWriter::from_config(config));

        Ok(match queue {
            Some(queue) => sink.with_queue(queue, config.queue_name.clone()),
            None => sink,
        })
    }

    pub fn writer(&self) -> &Arc<dyn RecordWriter> {
        &self.writer
    }

    pub fn emergency(&self) -> &EmergencyWriter {
        &self.emergency
    }
}

/// 由配置中的目标描述构造主写入器
pub fn build_writer(config: &ThinkLogConfig) -> Result<Arc<dyn RecordWriter>> {
    match &config.sink {
        SinkDestination::Tracing { level } => {
            let level = level
                .parse::<tracing::Level>()
                .map_err(|_| ThinkLogError::InvalidLogLevel(level.clone()))?;
            Ok(Arc::new(
                TracingRecordWriter::new(level, config.channel.clone()).with_json_options(config.json),
            ))
        }
        SinkDestination::File {
            directory,
            filename,
        } => Ok(Arc::new(
            FileRecordWriter::new(directory, filename)?.with_json_options(config.json),
        )),
    }
}

#[async_trait]
impl LogSink for StandardSink {
    async fn write_sync(&self, record: &LogRecord) -> SinkResult<()> {
        self.writer.write(record).await
    }

    async fn dispatch_async(&self, record: &LogRecord) -> DispatchResult<()> {
        let queue = match &self.queue {
            Some(queue) if self.queue_available => queue,
            _ => return Err(DispatchError::Unavailable),
        };
        queue
            .push(QueuedRecord::new(self.queue_name.clone(), record.clone()))
            .await
    }

    async fn emergency_write(
        &self,
        record: &LogRecord,
        error: &(dyn StdError + Send + Sync),
    ) -> std::result::Result<(), EmergencyWriteError> {
        self.emergency.write_or_report(record, error).await
    }

    fn has_queue(&self) -> bool {
        self.queue.is_some() && self.queue_available
    }

    fn name(&self) -> &'static str {
        "standard"
    }

    fn metadata(&self) -> SinkMetadata {
        let metadata = SinkMetadata::new(self.name(), self.writer.name());
        match &self.queue {
            Some(queue) => metadata
                .with_queue(queue.name().to_string())
                .with_description(format!("{} writer with queue fallback", self.writer.name())),
            None => metadata.with_description(format!("{} writer", self.writer.name())),
        }
    }
}
