//! thinklog 核心模块
//!
//! 本模块包含事件定义、记录构建、脱敏、投递策略、客户端响应与顶层入口。

pub mod context;
pub mod dispatch;
pub mod event;
pub mod logger;
pub mod record;
pub mod redactor;
pub mod response;

// 重新导出核心类型
pub use context::{
    generate_request_id, BuildError, EventContextBuilder, RequestSnapshot,
    RequestSnapshotProvider, SystemSnapshot, SystemSnapshotProvider,
};
pub use dispatch::{DispatchOutcome, DispatchPolicy};
pub use event::{ApiError, ChangeKind, HttpContext, LogEvent, ModelChange, StackFrame};
pub use logger::{ThinkLogger, ThinkLoggerBuilder};
pub use record::{LogRecord, RecordCategory};
pub use redactor::{RedactionPolicy, Redactor, MASK_TOKEN};
pub use response::{
    classify, default_message, render_client_body, ClientBody, JsonResponse,
    JsonResponseEmitter, ResponseEmitter, StatusMap,
};
