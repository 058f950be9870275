//! 定义 thinklog 日志管道的内部诊断与指标。
//!
//! 此模块提供了对投递路径健康状况的可观测性：记录有多少记录被构建、
//! 走了哪条投递路径、触发了多少次降级与紧急写入。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 内部诊断与指标数据结构。
///
/// 使用原子操作确保线程安全。
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// 创建时间
    start_time: Option<Instant>,

    /// 已构建的日志记录数
    records_built: AtomicU64,

    /// 同步写入成功次数（含队列失败后的降级写入）
    delivered_sync: AtomicU64,

    /// 成功交给队列的次数
    delivered_async: AtomicU64,

    /// 队列投递失败、降级为同步写入的次数
    async_fallbacks: AtomicU64,

    /// 同步写入失败次数
    sync_failures: AtomicU64,

    /// 紧急日志写入成功次数
    emergency_writes: AtomicU64,

    /// 紧急日志写入失败（记录丢失）次数
    emergency_failures: AtomicU64,
}

/// 诊断数据的快照，用于外部查询。
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsSnapshot {
    pub uptime: Option<Duration>,
    pub records_built: u64,
    pub delivered_sync: u64,
    pub delivered_async: u64,
    pub async_fallbacks: u64,
    pub sync_failures: u64,
    pub emergency_writes: u64,
    pub emergency_failures: u64,
    /// 正常投递（同步或队列）的比例（百分比）
    pub delivery_rate_percent: f64,
}

impl Diagnostics {
    /// 创建新的诊断实例。
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn increment_records_built(&self) {
        self.records_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delivered_sync(&self) {
        self.delivered_sync.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delivered_async(&self) {
        self.delivered_async.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_async_fallbacks(&self) {
        self.async_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sync_failures(&self) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_emergency_writes(&self) {
        self.emergency_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_emergency_failures(&self) {
        self.emergency_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取诊断数据的快照。
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let delivered_sync = self.delivered_sync.load(Ordering::Relaxed);
        let delivered_async = self.delivered_async.load(Ordering::Relaxed);
        let emergency_writes = self.emergency_writes.load(Ordering::Relaxed);
        let emergency_failures = self.emergency_failures.load(Ordering::Relaxed);

        let delivered = delivered_sync + delivered_async;
        let total = delivered + emergency_writes + emergency_failures;
        let delivery_rate_percent = if total > 0 {
            (delivered as f64 / total as f64) * 100.0
        } else {
            100.0
        };

        DiagnosticsSnapshot {
            uptime: self.start_time.map(|start| start.elapsed()),
            records_built: self.records_built.load(Ordering::Relaxed),
            delivered_sync,
            delivered_async,
            async_fallbacks: self.async_fallbacks.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
            emergency_writes,
            emergency_failures,
            delivery_rate_percent,
        }
    }

    /// 重置所有计数器（主要用于测试）。
    pub fn reset(&self) {
        self.records_built.store(0, Ordering::Relaxed);
        self.delivered_sync.store(0, Ordering::Relaxed);
        self.delivered_async.store(0, Ordering::Relaxed);
        self.async_fallbacks.store(0, Ordering::Relaxed);
        self.sync_failures.store(0, Ordering::Relaxed);
        self.emergency_writes.store(0, Ordering::Relaxed);
        self.emergency_failures.store(0, Ordering::Relaxed);
    }
}

/// 全局诊断实例
static GLOBAL_DIAGNOSTICS: std::sync::OnceLock<Arc<Diagnostics>> = std::sync::OnceLock::new();

/// 初始化（或获取已存在的）全局诊断实例。
pub fn init_diagnostics() -> Arc<Diagnostics> {
    GLOBAL_DIAGNOSTICS
        .get_or_init(|| Arc::new(Diagnostics::new()))
        .clone()
}

/// 获取全局诊断实例的引用，尚未初始化时返回 None。
pub fn get_diagnostics_instance() -> Option<Arc<Diagnostics>> {
    GLOBAL_DIAGNOSTICS.get().cloned()
}

/// 获取全局诊断数据快照。
///
/// 如果诊断系统尚未初始化，返回全零的快照。
///
/// # 示例
///
/// ```rust
/// let diagnostics = thinklog::get_diagnostics();
/// println!("Records built: {}", diagnostics.records_built);
/// ```
pub fn get_diagnostics() -> DiagnosticsSnapshot {
    match GLOBAL_DIAGNOSTICS.get() {
        Some(diagnostics) => diagnostics.snapshot(),
        None => DiagnosticsSnapshot {
            uptime: None,
            records_built: 0,
            delivered_sync: 0,
            delivered_async: 0,
            async_fallbacks: 0,
            sync_failures: 0,
            emergency_writes: 0,
            emergency_failures: 0,
            delivery_rate_percent: 100.0,
        },
    }
}
