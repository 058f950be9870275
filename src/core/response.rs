//! 客户端错误响应
//!
//! 为 API 异常确定 HTTP 状态码并生成返回给客户端的错误体。
//! 非调试模式下只返回按状态码固定的提示文字，原始异常信息只出现在日志记录里。

use crate::config::{ApiErrorConfig, JsonOptions, StatusMapping};
use crate::core::event::ApiError;
use crate::utils::json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 未收录状态码的提示文字
pub const FALLBACK_MESSAGE: &str = "服务不可用";

/// 状态码对应的默认提示文字
pub fn default_message(status: u16) -> &'static str {
    match status {
        400 => "请求参数错误",
        401 => "未授权访问",
        403 => "禁止访问",
        404 => "资源不存在",
        500 => "服务器内部错误",
        _ => FALLBACK_MESSAGE,
    }
}

/// 有序的 类别 → 状态码 映射，先匹配者生效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMap {
    entries: Vec<StatusMapping>,
}

impl Default for StatusMap {
    fn default() -> Self {
        Self::from_config(&ApiErrorConfig::default())
    }
}

impl StatusMap {
    pub fn new(entries: Vec<StatusMapping>) -> Self {
        Self { entries }
    }

    pub fn from_config(config: &ApiErrorConfig) -> Self {
        Self::new(config.status_map.clone())
    }

    pub fn entries(&self) -> &[StatusMapping] {
        &self.entries
    }

    /// 确定异常对应的 HTTP 状态码
    ///
    /// 依次尝试映射表；都不匹配时使用异常自带的错误码（须在 `[400, 600)` 内），否则为 500。
    pub fn classify(&self, error: &ApiError) -> u16 {
        if let Some(mapping) = self
            .entries
            .iter()
            .find(|mapping| error.has_category(&mapping.category))
        {
            return mapping.status;
        }

        match u16::try_from(error.code) {
            Ok(code) if (400..600).contains(&code) => code,
            _ => 500,
        }
    }
}

/// 使用默认映射表确定状态码
pub fn classify(error: &ApiError) -> u16 {
    StatusMap::default().classify(error)
}

/// 返回给客户端的错误体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientBody {
    /// 异常自带的错误码
    pub code: i64,
    pub message: String,
    pub request_id: String,
    /// Unix 时间戳（秒）
    pub timestamp: i64,
    pub data: Option<Value>,
}

/// 生成客户端错误体，`data` 始终为 null
pub fn render_client_body(
    error: &ApiError,
    status: u16,
    request_id: &str,
    debug: bool,
) -> ClientBody {
    let message = if debug {
        error.message.clone()
    } else {
        default_message(status).to_string()
    };

    ClientBody {
        code: error.code,
        message,
        request_id: request_id.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        data: None,
    }
}

/// 宿主的 HTTP 响应构造接口
pub trait ResponseEmitter: Send + Sync {
    type Response;

    fn emit(&self, body: &ClientBody, status: u16) -> Self::Response;
}

/// 已序列化的 JSON 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// 按 JSON 编码选项生成 [`JsonResponse`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseEmitter {
    json: JsonOptions,
}

impl JsonResponseEmitter {
    pub fn new(json: JsonOptions) -> Self {
        Self { json }
    }
}

impl ResponseEmitter for JsonResponseEmitter {
    type Response = JsonResponse;

    fn emit(&self, body: &ClientBody, status: u16) -> JsonResponse {
        let body = json::encode(body, &self.json).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode client error body");
            serde_json::json!({
                "code": body.code,
                "message": FALLBACK_MESSAGE,
                "request_id": body.request_id,
                "timestamp": body.timestamp,
                "data": null,
            })
            .to_string()
        });

        JsonResponse {
            status,
            content_type: "application/json; charset=utf-8",
            body,
        }
    }
}
