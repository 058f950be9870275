//! 环境变量配置模块
//!
//! 允许部署环境覆盖配置文件中的少量运行参数。

use crate::config::{LogMode, ThinkLogConfig};
use crate::error::{Result, ThinkLogError};
use std::env;
use std::path::PathBuf;

pub const ENV_MODE: &str = "THINKLOG_MODE";
pub const ENV_QUEUE_NAME: &str = "THINKLOG_QUEUE_NAME";
pub const ENV_DEBUG: &str = "THINKLOG_DEBUG";
pub const ENV_RUNTIME_DIR: &str = "THINKLOG_RUNTIME_DIR";

/// 环境变量配置管理器
pub struct EnvConfig;

impl EnvConfig {
    /// 从环境变量读取日志模式
    pub fn get_mode() -> Option<String> {
        Self::read(ENV_MODE)
    }

    /// 从环境变量读取队列名称
    pub fn get_queue_name() -> Option<String> {
        Self::read(ENV_QUEUE_NAME)
    }

    /// 从环境变量读取调试开关
    pub fn get_debug() -> Option<String> {
        Self::read(ENV_DEBUG)
    }

    /// 从环境变量读取运行时目录
    pub fn get_runtime_dir() -> Option<String> {
        Self::read(ENV_RUNTIME_DIR)
    }

    fn read(key: &str) -> Option<String> {
        env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    /// 将进程环境中的覆盖项应用到配置上
    pub fn apply_overrides(config: &mut ThinkLogConfig) -> Result<()> {
        Self::apply_overrides_with(config, Self::read)
    }

    /// 使用给定的查找函数应用覆盖项
    pub fn apply_overrides_with<F>(config: &mut ThinkLogConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE) {
            config.mode = mode
                .parse::<LogMode>()
                .map_err(|e| ThinkLogError::config(format!("{}: {}", ENV_MODE, e)))?;
        }

        if let Some(queue_name) = lookup(ENV_QUEUE_NAME) {
            config.queue_name = queue_name;
        }

        if let Some(debug) = lookup(ENV_DEBUG) {
            config.debug = parse_bool(&debug).ok_or_else(|| {
                ThinkLogError::config(format!("{}: invalid boolean '{}'", ENV_DEBUG, debug))
            })?;
        }

        if let Some(dir) = lookup(ENV_RUNTIME_DIR) {
            config.runtime_dir = PathBuf::from(dir);
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
