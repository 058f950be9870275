//! 文件工具模块
//!
//! 提供日志文件写入前的目录准备与权限检查。

use crate::error::{Result, ThinkLogError};
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// 文件工具结构体
pub struct FileTools;

impl FileTools {
    /// 确保目录存在，如果不存在则创建
    ///
    /// 路径已存在但不是目录时返回错误。
    pub fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();

        if !path.exists() {
            fs::create_dir_all(path)?;
        } else if !path.is_dir() {
            return Err(ThinkLogError::IoError {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("路径存在但不是目录: {}", path.display()),
                ),
            });
        }

        Ok(())
    }

    /// 以追加模式打开文件，必要时创建父目录与文件
    pub fn open_file_append<P: AsRef<Path>>(file_path: P) -> Result<File> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_directory_exists(parent)?;
            }
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .map_err(|e| ThinkLogError::IoError { source: e })
    }

    /// 检查目录是否可写
    ///
    /// 通过在目录中创建并删除一个探测文件来判断。
    pub fn is_directory_writable<P: AsRef<Path>>(dir_path: P) -> bool {
        let dir_path = dir_path.as_ref();

        if !dir_path.is_dir() {
            return false;
        }

        let probe = dir_path.join(".thinklog_write_test");
        let writable = File::create(&probe).is_ok();
        if writable {
            let _ = fs::remove_file(&probe);
        }
        writable
    }
}
