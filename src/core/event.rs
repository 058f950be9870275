//! thinklog 事件定义
//!
//! 宿主在捕获到 API 异常或模型写入事件时构造 [`LogEvent`]，交给管道处理一次后丢弃。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 异常调用栈中的一帧
///
/// `args` 只为完整描述宿主提供的原始帧而存在，任何日志输出都不会包含它。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StackFrame {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl StackFrame {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Default::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn in_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// 宿主捕获到的 API 异常
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiError {
    /// 异常自带的数值错误码
    pub code: i64,
    pub message: String,
    /// 异常所属的类别链，从具体到宽泛，用于状态码映射
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub trace: Vec<StackFrame>,
}

impl ApiError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            ..Default::default()
        }
    }

    /// 追加一个类别，例如 `validate`、`auth`、`http`
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_trace(mut self, trace: Vec<StackFrame>) -> Self {
        self.trace = trace;
        self
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

/// API 异常对应的响应侧信息
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HttpContext {
    /// 返回给客户端的状态码
    pub status: u16,
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// 原始响应体文本
    #[serde(default)]
    pub body: Option<String>,
}

impl HttpContext {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), Value::String(value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// 模型变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl ChangeKind {
    /// 写入事件按是否为更新区分新增与修改
    pub fn from_write(is_update: bool) -> Self {
        if is_update {
            ChangeKind::Updated
        } else {
            ChangeKind::Created
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Restored => "restored",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(ChangeKind::Created),
            "updated" => Ok(ChangeKind::Updated),
            "deleted" => Ok(ChangeKind::Deleted),
            "restored" => Ok(ChangeKind::Restored),
            _ => Err(format!("Invalid change kind: {}", s)),
        }
    }
}

/// 模型写入事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelChange {
    /// 完整模型标识，例如 `app\model\Order`
    pub model_name: String,
    pub table_name: String,
    pub primary_key: String,
    pub record_id: Value,
    pub change_kind: ChangeKind,
    #[serde(default)]
    pub changed_fields: Map<String, Value>,
}

impl ModelChange {
    pub fn new(
        model_name: impl Into<String>,
        table_name: impl Into<String>,
        primary_key: impl Into<String>,
        record_id: impl Into<Value>,
        change_kind: ChangeKind,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            table_name: table_name.into(),
            primary_key: primary_key.into(),
            record_id: record_id.into(),
            change_kind,
            changed_fields: Map::new(),
        }
    }

    pub fn with_change(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.changed_fields.insert(field.into(), value.into());
        self
    }

    pub fn with_changes(mut self, changes: Map<String, Value>) -> Self {
        self.changed_fields.extend(changes);
        self
    }

    /// 去掉命名空间后的模型名，`app\model\Order` -> `Order`
    pub fn short_model_name(&self) -> &str {
        self.model_name
            .rsplit(|c: char| c == '\\' || c == '/' || c == ':')
            .find(|part| !part.is_empty())
            .unwrap_or(&self.model_name)
    }
}

/// 进入日志管道的事件
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    ApiError { error: ApiError, http: HttpContext },
    ModelChange(ModelChange),
}

impl LogEvent {
    pub fn api_error(error: ApiError, http: HttpContext) -> Self {
        LogEvent::ApiError { error, http }
    }

    pub fn model_change(change: ModelChange) -> Self {
        LogEvent::ModelChange(change)
    }
}
