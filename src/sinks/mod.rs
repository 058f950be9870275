//! thinklog Sinks 模块
//!
//! 提供日志记录的投递目标：主写入器（文件、tracing）、宿主队列与紧急日志。

pub mod emergency;
pub mod file;
pub mod queue;
pub mod standard;
pub mod tracing_writer;
pub mod traits;

// 重新导出主要类型
pub use emergency::{EmergencyWriteError, EmergencyWriter, API_EMERGENCY_FILE, MODEL_EMERGENCY_FILE};
pub use file::FileRecordWriter;
pub use queue::{ChannelQueue, QueueReceiver};
pub use standard::{build_writer, StandardSink};
pub use tracing_writer::TracingRecordWriter;
pub use traits::{
    DispatchError, DispatchResult, LogQueue, LogSink, QueuedRecord, RecordWriter, SinkError,
    SinkMetadata, SinkResult,
};
