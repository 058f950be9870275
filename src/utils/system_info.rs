//! 系统信息获取模块
//!
//! 提供进程级系统快照：运行时版本、框架标识、内存占用、主机名与进程 ID。

use crate::core::context::{SystemSnapshot, SystemSnapshotProvider};

/// 编译本库所用的 rustc 版本
pub const RUSTC_VERSION: &str = env!("THINKLOG_RUSTC_VERSION");

/// 从当前进程读取系统快照
///
/// 主机名在构造时读取一次，内存占用在每次快照时重新读取。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSystemInfo {
    framework: String,
    hostname: String,
}

impl Default for ProcessSystemInfo {
    fn default() -> Self {
        Self::new(format!("thinklog/{}", crate::VERSION))
    }
}

impl ProcessSystemInfo {
    /// `framework` 为宿主框架的名称与版本，例如 `axum/0.7`
    pub fn new(framework: impl Into<String>) -> Self {
        Self {
            framework: framework.into(),
            hostname: get_hostname(),
        }
    }

    pub fn framework(&self) -> &str {
        &self.framework
    }
}

impl SystemSnapshotProvider for ProcessSystemInfo {
    fn system_snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            runtime_version: format!("rustc {}", RUSTC_VERSION),
            framework: self.framework.clone(),
            memory_usage: format_memory(get_memory_usage_bytes()),
            hostname: Some(self.hostname.clone()),
            pid: Some(get_pid()),
        }
    }
}

/// 获取当前进程ID
pub fn get_pid() -> u32 {
    std::process::id()
}

/// 获取主机名，失败时返回 "unknown"
pub fn get_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .ok()
        .unwrap_or_else(|| "unknown".to_string())
}

/// 进程常驻内存峰值（字节），无法获取时返回 None
pub fn get_memory_usage_bytes() -> Option<u64> {
    #[cfg(unix)]
    {
        let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
        // SAFETY: getrusage 只写入传入的结构体
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        // SAFETY: rc == 0 时结构体已被完整写入
        let usage = unsafe { usage.assume_init() };
        let max_rss = u64::try_from(usage.ru_maxrss).ok()?;

        // macOS 以字节为单位，其余平台以 KB 为单位
        if cfg!(target_os = "macos") {
            Some(max_rss)
        } else {
            Some(max_rss * 1024)
        }
    }

    #[cfg(not(unix))]
    {
        None
    }
}

/// 格式化为 `12.34MB`，未知时为 `unknown`
pub fn format_memory(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format!("{:.2}MB", bytes as f64 / 1024.0 / 1024.0),
        None => "unknown".to_string(),
    }
}
