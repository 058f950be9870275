//! 事件上下文构建
//!
//! 把捕获到的事件、请求快照与系统快照组装为 [`LogRecord`]。构建过程不会失败：
//! 任何子字段读取出错都只会让该字段退化为默认值。

use crate::config::ThinkLogConfig;
use crate::core::event::{ApiError, HttpContext, LogEvent, ModelChange, StackFrame};
use crate::core::record::{LogRecord, RecordCategory};
use crate::core::redactor::{RedactionPolicy, Redactor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// 构建过程中单个字段的读取失败。只会导致该字段降级，不会中断构建。
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("response body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("field '{field}' could not be serialized: {reason}")]
    Unserializable { field: &'static str, reason: String },
}

/// 当前请求的快照
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub ip: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RequestSnapshot {
    pub fn new(method: impl Into<String>, url: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ip: ip.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// 运行环境的快照
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub runtime_version: String,
    pub framework: String,
    /// 形如 `12.5MB`
    pub memory_usage: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
}

/// 由宿主提供当前请求的快照
pub trait RequestSnapshotProvider: Send + Sync {
    fn request_snapshot(&self) -> RequestSnapshot;
}

/// 由宿主提供运行环境的快照
pub trait SystemSnapshotProvider: Send + Sync {
    fn system_snapshot(&self) -> SystemSnapshot;
}

impl RequestSnapshotProvider for RequestSnapshot {
    fn request_snapshot(&self) -> RequestSnapshot {
        self.clone()
    }
}

impl SystemSnapshotProvider for SystemSnapshot {
    fn system_snapshot(&self) -> SystemSnapshot {
        self.clone()
    }
}

/// 生成新的请求关联 ID（32 位小写十六进制）
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// 上下文构建器
#[derive(Debug, Clone)]
pub struct EventContextBuilder {
    redactor: Redactor,
    except_fields: HashSet<String>,
    trace_depth: usize,
    body_limit: usize,
}

impl Default for EventContextBuilder {
    fn default() -> Self {
        Self::from_config(&ThinkLogConfig::default())
    }
}

impl EventContextBuilder {
    pub fn new(redactor: Redactor) -> Self {
        Self {
            redactor,
            ..Default::default()
        }
    }

    pub fn from_config(config: &ThinkLogConfig) -> Self {
        Self {
            redactor: Redactor::new(RedactionPolicy::from_config(&config.redaction)),
            except_fields: config.model.except_fields.iter().cloned().collect(),
            trace_depth: config.api_error.trace_depth,
            body_limit: config.api_error.body_limit,
        }
    }

    pub fn with_except_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trace_depth(mut self, depth: usize) -> Self {
        self.trace_depth = depth;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// 使用新生成的关联 ID 构建记录
    pub fn build(
        &self,
        event: &LogEvent,
        request: &RequestSnapshot,
        system: &SystemSnapshot,
    ) -> LogRecord {
        self.build_with_id(event, request, system, generate_request_id())
    }

    /// 使用宿主已分配的关联 ID 构建记录，使客户端响应与日志能够对应
    pub fn build_with_id(
        &self,
        event: &LogEvent,
        request: &RequestSnapshot,
        system: &SystemSnapshot,
        request_id: String,
    ) -> LogRecord {
        let system = to_value_or_default("system", system);

        match event {
            LogEvent::ApiError { error, http } => {
                let mut record = LogRecord::new(request_id, RecordCategory::ApiError);
                record.insert("request", self.request_info(request));
                record.insert("error", self.error_details(error));
                record.insert("response", self.response_info(http));
                record.insert("system", system);
                record
            }
            LogEvent::ModelChange(change) => {
                let mut record = LogRecord::new(request_id, RecordCategory::ModelChange);
                self.model_details(&mut record, change);
                record.insert("ip", Value::String(request.ip.clone()));
                record.insert("system", system);
                record
            }
        }
    }

    fn request_info(&self, request: &RequestSnapshot) -> Value {
        let (params, headers) = self.redactor.redact(&request.params, &request.headers);
        json!({
            "method": request.method,
            "url": request.url,
            "ip": request.ip,
            "headers": headers,
            "params": params,
        })
    }

    fn error_details(&self, error: &ApiError) -> Value {
        json!({
            "code": error.code,
            "message": error.message,
            "file": error.file.clone().unwrap_or_default(),
            "line": error.line.unwrap_or(0),
            "trace": self.summarize_trace(&error.trace),
        })
    }

    /// 每帧只保留文件、行号、函数与类名，最多 `trace_depth` 帧
    pub fn summarize_trace(&self, frames: &[StackFrame]) -> Vec<Value> {
        frames
            .iter()
            .take(self.trace_depth)
            .map(|frame| {
                json!({
                    "file": frame.file.clone().unwrap_or_default(),
                    "line": frame.line.unwrap_or(0),
                    "function": frame.function.clone().unwrap_or_default(),
                    "class": frame.class.clone().unwrap_or_default(),
                })
            })
            .collect()
    }

    fn response_info(&self, http: &HttpContext) -> Value {
        json!({
            "status": http.status,
            "data": self.format_response_body(http.body.as_deref()),
            "headers": self.redactor.redact_headers(&http.headers),
        })
    }

    /// 合法 JSON 响应体解析后脱敏顶层字段，否则截断为 `body_limit` 个字符
    pub fn format_response_body(&self, body: Option<&str>) -> Value {
        let Some(body) = body else {
            return Value::String(String::new());
        };

        match parse_json_body(body) {
            Ok(parsed) => self.redactor.redact_value(&parsed),
            Err(e) => {
                debug!(error = %e, "response body logged as truncated text");
                Value::String(body.chars().take(self.body_limit).collect())
            }
        }
    }

    fn model_details(&self, record: &mut LogRecord, change: &ModelChange) {
        record.insert("model", Value::String(change.model_name.clone()));
        record.insert("table", Value::String(change.table_name.clone()));
        record.insert("pk", Value::String(change.primary_key.clone()));
        record.insert("id", change.record_id.clone());
        record.insert("event", Value::String(change.change_kind.as_str().to_string()));
        let changes = self.filter_changes(&change.changed_fields);
        record.insert("changes", Value::Object(self.redactor.redact_fields(&changes)));
    }

    /// 去掉排除列表中的字段
    pub fn filter_changes(&self, changes: &Map<String, Value>) -> Map<String, Value> {
        changes
            .iter()
            .filter(|(key, _)| !self.except_fields.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn parse_json_body(body: &str) -> Result<Value, BuildError> {
    if body.trim().is_empty() {
        return Err(BuildError::InvalidBody("empty body".to_string()));
    }
    serde_json::from_str(body).map_err(|e| BuildError::InvalidBody(e.to_string()))
}

fn to_value_or_default<T: Serialize>(field: &'static str, value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        let err = BuildError::Unserializable {
            field,
            reason: e.to_string(),
        };
        debug!(error = %err, "field degraded to empty object");
        Value::Object(Map::new())
    })
}
