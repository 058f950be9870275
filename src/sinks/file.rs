//! JSON Lines 文件写入器
//!
//! 每条记录序列化为一行 JSON 追加到文件末尾，写入后立即刷新。

use crate::config::JsonOptions;
use crate::core::record::LogRecord;
use crate::error::{Result, ThinkLogError};
use crate::sinks::traits::{RecordWriter, SinkError, SinkResult};
use crate::utils::FileTools;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 追加写入的文件目标
///
/// 同一实例可被多个任务并发使用，写入在互斥锁内串行化。
#[derive(Debug, Clone)]
pub struct FileRecordWriter {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
    json: JsonOptions,
}

impl FileRecordWriter {
    /// 在 `directory` 下打开（或创建）`filename`
    pub fn new(directory: impl AsRef<Path>, filename: &str) -> Result<Self> {
        let directory = directory.as_ref();
        FileTools::ensure_directory_exists(directory)?;

        if !FileTools::is_directory_writable(directory) {
            return Err(ThinkLogError::IoError {
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("目录不可写: {}", directory.display()),
                ),
            });
        }

        let path = directory.join(filename);
        let file = FileTools::open_file_append(&path)?;

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            json: JsonOptions::default(),
        })
    }

    /// 设置 JSON 编码选项。`pretty` 会被忽略，每条记录始终占一行。
    pub fn with_json_options(mut self, json: JsonOptions) -> Self {
        self.json = JsonOptions {
            pretty: false,
            ..json
        };
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordWriter for FileRecordWriter {
    async fn write(&self, record: &LogRecord) -> SinkResult<()> {
        let mut line = record.to_json(&self.json)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    async fn flush(&self) -> SinkResult<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().map_err(SinkError::from)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
