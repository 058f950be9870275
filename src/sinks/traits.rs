//! thinklog Sink Traits
//!
//! 定义日志投递的三项能力以及构成它们的协作者接口。
//!
//! # 架构设计
//!
//! - `LogSink`: 管道直接调用的接口，提供同步写入、队列投递与紧急写入
//! - `RecordWriter`: 主目标（文件、tracing 等），同步写入与队列消费者都会用到
//! - `LogQueue`: 宿主注入的队列，只负责非阻塞地接收记录
//!
//! # 使用示例
//!
//! ```rust
//! use thinklog::sinks::traits::{RecordWriter, SinkResult};
//! use thinklog::LogRecord;
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct StdoutWriter;
//!
//! #[async_trait]
//! impl RecordWriter for StdoutWriter {
//!     async fn write(&self, record: &LogRecord) -> SinkResult<()> {
//!         println!("{}", record.summary());
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "stdout"
//!     }
//! }
//! ```

use crate::core::record::LogRecord;
use crate::sinks::emergency::EmergencyWriteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt::Debug;

/// 管道使用的 Sink 接口
///
/// 队列能力在构造时确定，`has_queue` 不应在调用时做探测。
#[async_trait]
pub trait LogSink: Send + Sync + Debug {
    /// 同步、持久地写入主目标
    async fn write_sync(&self, record: &LogRecord) -> SinkResult<()>;

    /// 交给队列做带外处理。立即返回，不保证记录已经持久化。
    async fn dispatch_async(&self, record: &LogRecord) -> DispatchResult<()>;

    /// 最后手段：追加写入本地紧急日志文件
    ///
    /// 失败时实现方必须自行上报到进程级诊断通道，返回的错误只用于统计，
    /// 调用方不会再向外传播。
    async fn emergency_write(
        &self,
        record: &LogRecord,
        error: &(dyn StdError + Send + Sync),
    ) -> Result<(), EmergencyWriteError>;

    /// 是否注册了可用的队列
    fn has_queue(&self) -> bool;

    /// 获取 sink 的名称
    fn name(&self) -> &'static str;

    /// 获取 sink 的元数据
    fn metadata(&self) -> SinkMetadata;
}

/// 日志主目标
#[async_trait]
pub trait RecordWriter: Send + Sync + Debug {
    async fn write(&self, record: &LogRecord) -> SinkResult<()>;

    /// 刷新缓冲区，默认无操作
    async fn flush(&self) -> SinkResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// 宿主注入的队列
#[async_trait]
pub trait LogQueue: Send + Sync + Debug {
    /// 非阻塞地投递一条任务
    async fn push(&self, job: QueuedRecord) -> DispatchResult<()>;

    /// 队列当前是否可用，在构造 sink 时读取一次
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// 投递到队列中的任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRecord {
    /// 目标队列名称
    pub queue: String,
    /// 任务类型，消费者据此选择处理方式
    pub job: String,
    pub record: LogRecord,
}

impl QueuedRecord {
    pub fn new(queue: impl Into<String>, record: LogRecord) -> Self {
        Self {
            queue: queue.into(),
            job: format!("{}_log", record.category),
            record,
        }
    }
}

/// Sink 元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkMetadata {
    /// Sink 名称
    pub name: String,
    /// 主目标名称
    pub writer: String,
    /// 注册的队列名称
    pub queue: Option<String>,
    /// 描述信息
    pub description: Option<String>,
}

impl SinkMetadata {
    pub fn new(name: impl Into<String>, writer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            writer: writer.into(),
            queue: None,
            description: None,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// 同步写入错误
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// I/O 错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Sink 已关闭
    #[error("Sink is closed")]
    Closed,

    /// 通用错误
    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        SinkError::Serialization(e.to_string())
    }
}

/// 队列投递错误
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// 没有注册队列
    #[error("No queue registered")]
    Unavailable,

    /// 队列已满
    #[error("Queue '{0}' is full")]
    Full(String),

    /// 队列已关闭
    #[error("Queue '{0}' is closed")]
    Closed(String),

    /// 队列拒绝了任务
    #[error("Queue rejected job: {0}")]
    Rejected(String),
}

/// Sink 结果类型
pub type SinkResult<T> = Result<T, SinkError>;

/// 队列投递结果类型
pub type DispatchResult<T> = Result<T, DispatchError>;
