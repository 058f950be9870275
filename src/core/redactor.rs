//! 敏感数据脱敏
//!
//! 对参数、请求体和请求头中命中敏感集合的键，用固定掩码替换其值。
//! 键名比较不区分大小写。
//!
//! 默认只处理映射的顶层键，嵌套结构原样保留；开启递归模式后会深入
//! 嵌套对象与数组。

use crate::config::RedactionConfig;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// 替换敏感值的掩码
pub const MASK_TOKEN: &str = "******";

/// 脱敏策略：敏感字段集合与敏感请求头集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionPolicy {
    fields: HashSet<String>,
    headers: HashSet<String>,
    recursive: bool,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::from_config(&RedactionConfig::default())
    }
}

impl RedactionPolicy {
    pub fn new<F, H, S, T>(fields: F, headers: H) -> Self
    where
        F: IntoIterator<Item = S>,
        H: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            fields: fields.into_iter().map(|f| f.as_ref().to_lowercase()).collect(),
            headers: headers.into_iter().map(|h| h.as_ref().to_lowercase()).collect(),
            recursive: false,
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(&config.sensitive_fields, &config.sensitive_headers).recursive(config.recursive)
    }

    /// 开启或关闭递归脱敏
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn is_sensitive_field(&self, key: &str) -> bool {
        self.fields.contains(&key.to_lowercase())
    }

    pub fn is_sensitive_header(&self, key: &str) -> bool {
        self.headers.contains(&key.to_lowercase())
    }
}

/// 脱敏器。纯函数，不会失败。
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    policy: RedactionPolicy,
}

impl Redactor {
    pub fn new(policy: RedactionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    /// 脱敏参数或请求体映射
    pub fn redact_fields(&self, map: &Map<String, Value>) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| {
                let value = if self.policy.is_sensitive_field(key) {
                    mask()
                } else if self.policy.recursive {
                    self.redact_nested(value)
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// 脱敏请求头映射。请求头不做递归处理。
    pub fn redact_headers(&self, map: &Map<String, Value>) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| {
                let value = if self.policy.is_sensitive_header(key) {
                    mask()
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// 对象按字段脱敏，其它类型原样返回
    pub fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.redact_fields(map)),
            Value::Array(items) if self.policy.recursive => {
                Value::Array(items.iter().map(|item| self.redact_nested(item)).collect())
            }
            other => other.clone(),
        }
    }

    /// 同时脱敏参数与请求头，返回 `(params, headers)`
    pub fn redact(
        &self,
        params: &Map<String, Value>,
        headers: &Map<String, Value>,
    ) -> (Map<String, Value>, Map<String, Value>) {
        (self.redact_fields(params), self.redact_headers(headers))
    }

    fn redact_nested(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.redact_fields(map)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.redact_nested(item)).collect())
            }
            other => other.clone(),
        }
    }
}

fn mask() -> Value {
    Value::String(MASK_TOKEN.to_string())
}
