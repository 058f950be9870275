//! 紧急日志
//!
//! 正常投递路径全部失败时，把记录和失败原因追加到运行时日志目录下的固定文件。
//! 每次写入都受超时约束；写入本身失败时只上报到 stderr 与 tracing，不再向外传播。

use crate::config::{JsonOptions, ThinkLogConfig};
use crate::core::record::{LogRecord, RecordCategory};
use crate::utils::json;
use serde_json::{json as json_value, Value};
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// API 异常的紧急日志文件名
pub const API_EMERGENCY_FILE: &str = "api_emergency.log";
/// 模型变更的紧急日志文件名
pub const MODEL_EMERGENCY_FILE: &str = "model_emergency.log";

/// 紧急写入失败
#[derive(Debug, thiserror::Error)]
pub enum EmergencyWriteError {
    #[error("emergency log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("emergency log write timed out after {0:?}")]
    Timeout(Duration),

    #[error("emergency log serialization failed: {0}")]
    Serialization(String),
}

/// 紧急日志写入器
#[derive(Debug, Clone)]
pub struct EmergencyWriter {
    directory: PathBuf,
    timeout: Duration,
    json: JsonOptions,
}

impl EmergencyWriter {
    pub fn new(directory: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            directory: directory.into(),
            timeout,
            json: JsonOptions::default(),
        }
    }

    pub fn from_config(config: &ThinkLogConfig) -> Self {
        Self {
            directory: config.emergency_log_dir(),
            timeout: config.emergency_timeout(),
            json: config.json,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 记录类别对应的紧急日志路径
    pub fn path_for(&self, category: RecordCategory) -> PathBuf {
        let filename = match category {
            RecordCategory::ApiError => API_EMERGENCY_FILE,
            RecordCategory::ModelChange => MODEL_EMERGENCY_FILE,
        };
        self.directory.join(filename)
    }

    /// 渲染一个紧急日志块
    ///
    /// API 异常使用美化 JSON `{time, context, error}`；模型变更使用
    /// `[time] Model log failed: ...` 文本块。两者都以换行结束。
    pub fn render(
        &self,
        record: &LogRecord,
        error: &(dyn StdError + Send + Sync),
    ) -> Result<String, EmergencyWriteError> {
        let time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let context = record
            .to_value()
            .map_err(|e| EmergencyWriteError::Serialization(e.to_string()))?;

        match record.category {
            RecordCategory::ApiError => {
                let block: Value = json_value!({
                    "time": time,
                    "context": context,
                    "error": error.to_string(),
                });
                let options = JsonOptions {
                    pretty: true,
                    ..self.json
                };
                let text = json::encode(&block, &options)
                    .map_err(|e| EmergencyWriteError::Serialization(e.to_string()))?;
                Ok(format!("{}\n", text))
            }
            RecordCategory::ModelChange => {
                let data = json::encode(&context, &self.json)
                    .map_err(|e| EmergencyWriteError::Serialization(e.to_string()))?;
                Ok(format!(
                    "[{}] Model log failed: {}\nEvent: {}\nData: {}\n",
                    time,
                    error,
                    record.event_label(),
                    data
                ))
            }
        }
    }

    /// 追加一个紧急日志块，受超时约束
    pub async fn write(
        &self,
        record: &LogRecord,
        error: &(dyn StdError + Send + Sync),
    ) -> Result<PathBuf, EmergencyWriteError> {
        let block = self.render(record, error)?;
        let path = self.path_for(record.category);

        match tokio::time::timeout(self.timeout, append(&path, block.as_bytes())).await {
            Ok(result) => result.map(|_| path),
            Err(_) => Err(EmergencyWriteError::Timeout(self.timeout)),
        }
    }

    /// 追加一个紧急日志块；失败只上报到诊断通道
    pub async fn write_or_report(
        &self,
        record: &LogRecord,
        error: &(dyn StdError + Send + Sync),
    ) -> Result<(), EmergencyWriteError> {
        match self.write(record, error).await {
            Ok(path) => {
                tracing::warn!(
                    request_id = %record.request_id,
                    path = %path.display(),
                    "log record written to emergency log"
                );
                Ok(())
            }
            Err(final_error) => {
                report_critical_failure(&final_error, error);
                Err(final_error)
            }
        }
    }
}

async fn append(path: &Path, data: &[u8]) -> Result<(), EmergencyWriteError> {
    let io_err = |source: std::io::Error| EmergencyWriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(io_err)?;
    file.write_all(data).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    Ok(())
}

/// 进程级诊断通道
fn report_critical_failure(final_error: &EmergencyWriteError, original: &(dyn StdError + Send + Sync)) {
    eprintln!(
        "Critical logging failure: {}\nOriginal error: {}",
        final_error, original
    );
    tracing::error!(
        error = %final_error,
        original_error = %original,
        "emergency log write failed, record lost"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::traits::SinkError;
    use serde_json::json;

    fn model_record() -> LogRecord {
        let mut record = LogRecord::new("rid-1", RecordCategory::ModelChange);
        record.insert("model", json!("Order"));
        record.insert("event", json!("deleted"));
        record.insert("changes", json!({"status": "已取消"}));
        record
    }

    fn api_record() -> LogRecord {
        let mut record = LogRecord::new("rid-2", RecordCategory::ApiError);
        record.insert("error", json!({"message": "boom"}));
        record
    }

    #[test]
    fn test_path_for_category() {
        let writer = EmergencyWriter::new("/srv/runtime/log", Duration::from_secs(1));
        assert_eq!(
            writer.path_for(RecordCategory::ApiError),
            PathBuf::from("/srv/runtime/log/api_emergency.log")
        );
        assert_eq!(
            writer.path_for(RecordCategory::ModelChange),
            PathBuf::from("/srv/runtime/log/model_emergency.log")
        );
    }

    #[test]
    fn test_from_config_uses_runtime_log_dir() {
        let config = ThinkLogConfig {
            runtime_dir: PathBuf::from("/app/runtime"),
            ..Default::default()
        };
        let writer = EmergencyWriter::from_config(&config);
        assert_eq!(writer.directory(), Path::new("/app/runtime/log"));
    }

    #[test]
    fn test_render_model_block() {
        let writer = EmergencyWriter::new("/tmp", Duration::from_secs(1));
        let error = SinkError::Generic("disk full".to_string());
        let block = writer.render(&model_record(), &error).unwrap();

        assert!(block.starts_with('['));
        assert!(block.contains("] Model log failed: Generic error: disk full\n"));
        assert!(block.contains("\nEvent: deleted\n"));
        assert!(block.contains("Data: {"));
        assert!(block.contains("已取消"));
        assert!(block.ends_with('\n'));
    }

    #[test]
    fn test_render_api_block_is_pretty_json() {
        let writer = EmergencyWriter::new("/tmp", Duration::from_secs(1));
        let error = SinkError::Closed;
        let block = writer.render(&api_record(), &error).unwrap();

        let parsed: Value = serde_json::from_str(block.trim_end()).unwrap();
        assert_eq!(parsed["error"], json!("Sink is closed"));
        assert_eq!(parsed["context"]["request_id"], json!("rid-2"));
        assert!(parsed["time"].is_string());
        assert!(block.contains("\n  "));
    }

    #[tokio::test]
    async fn test_write_appends_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EmergencyWriter::new(dir.path().join("log"), Duration::from_secs(2));
        let error = SinkError::Generic("first".to_string());

        writer.write(&model_record(), &error).await.unwrap();
        let error = SinkError::Generic("second".to_string());
        let path = writer.write(&model_record(), &error).await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.matches("Model log failed").count(), 2);
        assert!(content.contains("first"));
        assert!(content.contains("second"));
    }

    #[tokio::test]
    async fn test_write_gives_up_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EmergencyWriter::new(dir.path().join("log"), Duration::ZERO);
        let error = SinkError::Generic("disk full".to_string());

        let result = writer.write(&model_record(), &error).await;
        assert!(matches!(
            result,
            Err(EmergencyWriteError::Timeout(limit)) if limit == Duration::ZERO
        ));

        let result = writer.write_or_report(&api_record(), &error).await;
        assert!(matches!(result, Err(EmergencyWriteError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_write_or_report_swallows_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // 用普通文件占住目录位置，使创建目录失败
        let blocker = dir.path().join("log");
        std::fs::write(&blocker, "not a directory").unwrap();

        let writer = EmergencyWriter::new(&blocker, Duration::from_secs(2));
        let error = SinkError::Closed;
        let result = writer.write_or_report(&api_record(), &error).await;
        assert!(matches!(result, Err(EmergencyWriteError::Io { .. })));
    }
}
