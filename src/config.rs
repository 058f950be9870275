//! 定义 thinklog 的所有配置结构体。
//!
//! 配置在构造时显式传入，不在调用路径上做全局查找。

use serde::Deserialize;
use std::path::PathBuf;

// --- 辅助函数，用于提供配置项的默认值 ---
fn default_mode() -> LogMode {
    LogMode::Async
}
fn default_queue_name() -> String {
    "default".to_string()
}
fn default_channel() -> String {
    "model".to_string()
}
fn default_false() -> bool {
    false
}
fn default_runtime_dir() -> PathBuf {
    PathBuf::from("runtime")
}
fn default_emergency_timeout_ms() -> u64 {
    2000
}
fn default_sink_level() -> String {
    "INFO".to_string()
}
fn default_sink_filename() -> String {
    "thinklog.jsonl".to_string()
}
fn default_sensitive_fields() -> Vec<String> {
    vec![
        "password".to_string(),
        "token".to_string(),
        "credit_card".to_string(),
    ]
}
fn default_sensitive_headers() -> Vec<String> {
    vec!["authorization".to_string(), "cookie".to_string()]
}
fn default_except_fields() -> Vec<String> {
    vec![
        "update_time".to_string(),
        "update_at".to_string(),
        "delete_time".to_string(),
    ]
}
fn default_status_map() -> Vec<StatusMapping> {
    vec![
        StatusMapping::new("validate", 422),
        StatusMapping::new("auth", 401),
        StatusMapping::new("http", 404),
    ]
}
fn default_trace_depth() -> usize {
    20
}
fn default_body_limit() -> usize {
    500
}

/// 日志投递模式。
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// 直接写入主目标。
    Sync,
    /// 优先交给队列，队列不可用时退化为同步写入。
    #[default]
    Async,
}

impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" => Ok(LogMode::Sync),
            "async" => Ok(LogMode::Async),
            _ => Err(format!("Invalid log mode: {}", s)),
        }
    }
}

/// 主日志目标。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkDestination {
    /// 以结构化 tracing 事件输出，`channel` 作为事件字段。
    Tracing {
        #[serde(default = "default_sink_level")]
        level: String,
    },
    /// 以 JSON Lines 追加写入文件。
    File {
        directory: PathBuf,
        #[serde(default = "default_sink_filename")]
        filename: String,
    },
}

impl Default for SinkDestination {
    fn default() -> Self {
        SinkDestination::Tracing {
            level: default_sink_level(),
        }
    }
}

/// 敏感字段与请求头的脱敏配置。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RedactionConfig {
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
    #[serde(default = "default_sensitive_headers")]
    pub sensitive_headers: Vec<String>,
    /// 递归脱敏嵌套结构。默认只处理顶层键。
    #[serde(default = "default_false")]
    pub recursive: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: default_sensitive_fields(),
            sensitive_headers: default_sensitive_headers(),
            recursive: default_false(),
        }
    }
}

/// 错误类别到 HTTP 状态码的一条映射。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatusMapping {
    pub category: String,
    pub status: u16,
}

impl StatusMapping {
    pub fn new(category: impl Into<String>, status: u16) -> Self {
        Self {
            category: category.into(),
            status,
        }
    }
}

/// API 错误路径的配置。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiErrorConfig {
    /// 按顺序匹配，先匹配者生效
    #[serde(default = "default_status_map")]
    pub status_map: Vec<StatusMapping>,
    #[serde(default = "default_trace_depth")]
    pub trace_depth: usize,
    /// 非 JSON 响应体保留的最大字符数
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ApiErrorConfig {
    fn default() -> Self {
        Self {
            status_map: default_status_map(),
            trace_depth: default_trace_depth(),
            body_limit: default_body_limit(),
        }
    }
}

/// 模型变更日志的配置。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModelLogConfig {
    #[serde(default = "default_except_fields")]
    pub except_fields: Vec<String>,
}

impl Default for ModelLogConfig {
    fn default() -> Self {
        Self {
            except_fields: default_except_fields(),
        }
    }
}

/// JSON 编码选项。
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct JsonOptions {
    #[serde(default = "default_false")]
    pub pretty: bool,
    /// 将非 ASCII 字符转义为 `\uXXXX`
    #[serde(default = "default_false")]
    pub escape_unicode: bool,
}

/// thinklog 的顶层配置结构体。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ThinkLogConfig {
    #[serde(default = "default_mode")]
    pub mode: LogMode,
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_false")]
    pub debug: bool,
    /// 宿主运行时目录，紧急日志写在其下的 `log/` 中
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,
    #[serde(default = "default_emergency_timeout_ms")]
    pub emergency_timeout_ms: u64,
    #[serde(default)]
    pub sink: SinkDestination,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub api_error: ApiErrorConfig,
    #[serde(default)]
    pub model: ModelLogConfig,
    #[serde(default)]
    pub json: JsonOptions,
}

impl Default for ThinkLogConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            queue_name: default_queue_name(),
            channel: default_channel(),
            debug: default_false(),
            runtime_dir: default_runtime_dir(),
            emergency_timeout_ms: default_emergency_timeout_ms(),
            sink: SinkDestination::default(),
            redaction: RedactionConfig::default(),
            api_error: ApiErrorConfig::default(),
            model: ModelLogConfig::default(),
            json: JsonOptions::default(),
        }
    }
}

impl ThinkLogConfig {
    /// 紧急日志所在目录
    pub fn emergency_log_dir(&self) -> PathBuf {
        self.runtime_dir.join("log")
    }

    pub fn emergency_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.emergency_timeout_ms)
    }
}

/// 用于从 TOML 文件加载 `ThinkLogConfig` 的辅助函数。
pub fn load_config_from_file(path: &std::path::Path) -> crate::error::Result<ThinkLogConfig> {
    use crate::error::ThinkLogError;
    use std::fs;

    if !path.exists() {
        return Err(ThinkLogError::ConfigFileMissing(
            path.to_string_lossy().into_owned(),
        ));
    }

    let config_str = fs::read_to_string(path)?;
    load_config_from_str(&config_str)
}

/// 用于从 TOML 字符串加载 `ThinkLogConfig` 的辅助函数。
pub fn load_config_from_str(config_str: &str) -> crate::error::Result<ThinkLogConfig> {
    Ok(toml::from_str(config_str)?)
}

/// 验证配置的有效性。
pub fn validate_config(config: &ThinkLogConfig) -> crate::error::Result<()> {
    use crate::error::ThinkLogError;

    if config.mode == LogMode::Async && config.queue_name.trim().is_empty() {
        return Err(ThinkLogError::ConfigError(
            "异步模式下队列名称不能为空".to_string(),
        ));
    }

    if config.emergency_timeout_ms == 0 {
        return Err(ThinkLogError::ConfigError(
            "紧急日志超时时间必须大于0".to_string(),
        ));
    }

    match &config.sink {
        SinkDestination::Tracing { level } => match level.to_uppercase().as_str() {
            "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR" => {}
            _ => return Err(ThinkLogError::InvalidLogLevel(level.clone())),
        },
        SinkDestination::File {
            directory,
            filename,
        } => {
            if directory.as_os_str().is_empty() {
                return Err(ThinkLogError::InvalidPath(
                    "文件输出目录不能为空".to_string(),
                ));
            }
            if filename.trim().is_empty() {
                return Err(ThinkLogError::ConfigError("文件名不能为空".to_string()));
            }
        }
    }

    for mapping in &config.api_error.status_map {
        if mapping.category.trim().is_empty() {
            return Err(ThinkLogError::ConfigError(
                "状态码映射的错误类别不能为空".to_string(),
            ));
        }
        if !(100..600).contains(&mapping.status) {
            return Err(ThinkLogError::ConfigError(format!(
                "无效的 HTTP 状态码: {} ({})",
                mapping.status, mapping.category
            )));
        }
    }

    if config.api_error.body_limit == 0 {
        return Err(ThinkLogError::ConfigError(
            "响应体截断长度必须大于0".to_string(),
        ));
    }

    Ok(())
}
