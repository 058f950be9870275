//! thinklog - 结构化 API 异常与模型变更日志
//!
//! thinklog 捕获两类宿主事件：处理 HTTP 请求时抛出的 API 异常，以及 ORM 模型的
//! 写入事件（创建、更新、删除、恢复）。每个事件被组装为脱敏后的结构化记录，
//! 同步写入主目标或交给宿主注入的队列；任一环节失败都会逐级降级，最终落到
//! 本地紧急日志，日志系统本身永远不会让调用方失败。
//!
//! # 快速开始
//!
//! ```rust
//! use thinklog::{ApiError, JsonResponseEmitter, RequestSnapshot, ThinkLogConfig, ThinkLogger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let logger = ThinkLogger::with_config(ThinkLogConfig::default())?;
//!
//!     let request = RequestSnapshot::new("GET", "/users/7", "127.0.0.1");
//!     let error = ApiError::new(404, "user 7 not found").with_category("http");
//!
//!     let response = logger
//!         .handle_api_error(&error, &request, &JsonResponseEmitter::default())
//!         .await;
//!     assert_eq!(response.status, 404);
//!     Ok(())
//! }
//! ```
//!
//! # 模型事件
//!
//! ```rust
//! use thinklog::{ChangeKind, ModelChange, RequestSnapshot, ThinkLogger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let logger = ThinkLogger::builder().build()?;
//!
//!     let change = ModelChange::new("app\\model\\Order", "orders", "id", 42, ChangeKind::Updated)
//!         .with_change("status", "paid");
//!     logger.on_model_event(change, &RequestSnapshot::default()).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod env_config;
pub mod error;
pub mod sinks;
pub mod utils;

// 重新导出主要类型
pub use config::{
    load_config_from_file, load_config_from_str, validate_config, JsonOptions, LogMode,
    SinkDestination, ThinkLogConfig,
};
pub use diagnostics::{get_diagnostics, DiagnosticsSnapshot};
pub use error::{Result, ThinkLogError};

// 重新导出核心功能
pub use core::{
    classify, render_client_body, ApiError, ChangeKind, ClientBody, DispatchOutcome,
    DispatchPolicy, EventContextBuilder, HttpContext, JsonResponse, JsonResponseEmitter,
    LogEvent, LogRecord, ModelChange, RecordCategory, RedactionPolicy, Redactor,
    RequestSnapshot, RequestSnapshotProvider, ResponseEmitter, StackFrame, SystemSnapshot,
    SystemSnapshotProvider, ThinkLogger, ThinkLoggerBuilder, MASK_TOKEN,
};
pub use sinks::{
    ChannelQueue, EmergencyWriter, FileRecordWriter, LogQueue, LogSink, QueueReceiver,
    RecordWriter, StandardSink, TracingRecordWriter,
};

use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 构建时间（RFC 3339）
pub const BUILD_TIME: &str = env!("THINKLOG_BUILD_TIME");

/// 文件输出的后台写入守卫，进程存活期间保持
static FILE_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// 是否已由本库安装过全局 subscriber
static IS_TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ThinkLogError::InvalidLogLevel(format!("{}: {}", level, e)))
}

/// 为没有安装 subscriber 的宿主安装一个输出到 stderr 的 fmt subscriber
///
/// `RUST_LOG` 存在时优先使用，否则使用 `level`。已安装过 subscriber 时返回错误。
///
/// ```rust
/// thinklog::init_tracing("info").ok();
/// tracing::info!("ready");
/// ```
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = env_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ThinkLogError::tracing(e.to_string()))?;

    IS_TRACING_INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// 安装按天滚动的 JSON 文件 subscriber
///
/// 日志写入 `directory/prefix.YYYY-MM-DD`，由后台线程异步落盘。
pub fn init_file_tracing(directory: impl AsRef<Path>, prefix: &str, level: &str) -> Result<()> {
    let directory = directory.as_ref();
    utils::FileTools::ensure_directory_exists(directory)?;

    let filter = env_filter(level)?;
    let appender = tracing_appender::rolling::daily(directory, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| ThinkLogError::tracing(e.to_string()))?;

    if let Ok(mut slot) = FILE_GUARD.lock() {
        *slot = Some(guard);
    }
    IS_TRACING_INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// 本库是否已安装全局 subscriber
pub fn is_tracing_initialized() -> bool {
    IS_TRACING_INITIALIZED.load(Ordering::SeqCst)
}
