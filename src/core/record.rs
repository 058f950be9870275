//! 日志记录
//!
//! [`LogRecord`] 是离开上下文构建器、交给 sink 的唯一数据形态。

use crate::config::JsonOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 记录类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    ApiError,
    ModelChange,
}

impl RecordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordCategory::ApiError => "api_error",
            RecordCategory::ModelChange => "model_change",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化日志记录
///
/// 固定包含 `request_id`、`timestamp` 与 `category`，其余类别相关的子对象
/// （`request`、`error`、`response`、`changes`、`system` 等）展开在同一层。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub category: RecordCategory,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl LogRecord {
    pub fn new(request_id: impl Into<String>, category: RecordCategory) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            category,
            body: Map::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.body.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// 按 `.` 分隔的路径读取嵌套字段，例如 `request.method`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.body.get(first)?, |value, part| value.get(part))
    }

    fn str_at(&self, path: &str) -> String {
        match self.get_path(path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// 事件标签：模型记录取变更类型，API 记录固定为 `api_error`
    pub fn event_label(&self) -> String {
        match self.category {
            RecordCategory::ModelChange => self.str_at("event"),
            RecordCategory::ApiError => self.category.as_str().to_string(),
        }
    }

    /// 与上下文一同输出的单行摘要
    ///
    /// * API 异常: `[API ERROR][<id>] GET /users - message (Status:404)`
    /// * 模型变更: `[UPDATED] Order orders(id:42)`
    pub fn summary(&self) -> String {
        match self.category {
            RecordCategory::ApiError => format!(
                "[API ERROR][{}] {} {} - {} (Status:{})",
                self.request_id,
                self.str_at("request.method"),
                self.str_at("request.url"),
                self.str_at("error.message"),
                self.str_at("response.status"),
            ),
            RecordCategory::ModelChange => {
                let model = self.str_at("model");
                let short = model
                    .rsplit(|c: char| c == '\\' || c == '/' || c == ':')
                    .find(|part| !part.is_empty())
                    .unwrap_or_default()
                    .to_string();
                format!(
                    "[{}] {} {}(id:{})",
                    self.event_label().to_uppercase(),
                    short,
                    self.str_at("table"),
                    self.str_at("id"),
                )
            }
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self, options: &JsonOptions) -> serde_json::Result<String> {
        crate::utils::json::encode(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_record() -> LogRecord {
        let mut record = LogRecord::new("abc", RecordCategory::ModelChange);
        record.insert("model", json!("app\\model\\Order"));
        record.insert("table", json!("orders"));
        record.insert("id", json!(42));
        record.insert("event", json!("updated"));
        record
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = model_record();
        let value = record.to_value().unwrap();
        assert_eq!(value["request_id"], json!("abc"));
        assert_eq!(value["category"], json!("model_change"));
        assert_eq!(value["table"], json!("orders"));
        assert!(value["timestamp"].is_string());

        let back: LogRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_get_path() {
        let mut record = LogRecord::new("id", RecordCategory::ApiError);
        record.insert("request", json!({"method": "POST", "headers": {"host": "x"}}));
        assert_eq!(record.get_path("request.method"), Some(&json!("POST")));
        assert_eq!(record.get_path("request.headers.host"), Some(&json!("x")));
        assert_eq!(record.get_path("request.missing"), None);
        assert_eq!(record.get_path("nothing"), None);
    }

    #[test]
    fn test_model_summary() {
        assert_eq!(model_record().summary(), "[UPDATED] Order orders(id:42)");
        assert_eq!(model_record().event_label(), "updated");
    }

    #[test]
    fn test_api_error_summary() {
        let mut record = LogRecord::new("rid", RecordCategory::ApiError);
        record.insert("request", json!({"method": "GET", "url": "/users/7"}));
        record.insert("error", json!({"message": "not found"}));
        record.insert("response", json!({"status": 404}));
        assert_eq!(
            record.summary(),
            "[API ERROR][rid] GET /users/7 - not found (Status:404)"
        );
        assert_eq!(record.event_label(), "api_error");
    }

    #[test]
    fn test_summary_with_missing_fields() {
        let record = LogRecord::new("rid", RecordCategory::ApiError);
        assert_eq!(record.summary(), "[API ERROR][rid]   -  (Status:)");
    }
}
