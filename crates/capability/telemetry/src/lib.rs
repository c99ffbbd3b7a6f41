//! 日志初始化、采集周期 ID 与采集计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 采集指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub register_reads_ok: u64,
    pub register_reads_failed: u64,
    pub connection_failures: u64,
    pub deliveries_ok: u64,
    pub deliveries_failed: u64,
    pub unknown_devices: u64,
}

/// 采集指标（进程内计数）。
pub struct AcquisitionMetrics {
    cycles_completed: AtomicU64,
    register_reads_ok: AtomicU64,
    register_reads_failed: AtomicU64,
    connection_failures: AtomicU64,
    deliveries_ok: AtomicU64,
    deliveries_failed: AtomicU64,
    unknown_devices: AtomicU64,
}

impl AcquisitionMetrics {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            register_reads_ok: AtomicU64::new(0),
            register_reads_failed: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            deliveries_ok: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            unknown_devices: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            register_reads_ok: self.register_reads_ok.load(Ordering::Relaxed),
            register_reads_failed: self.register_reads_failed.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            deliveries_ok: self.deliveries_ok.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            unknown_devices: self.unknown_devices.load(Ordering::Relaxed),
        }
    }
}

impl Default for AcquisitionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<AcquisitionMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static AcquisitionMetrics {
    METRICS.get_or_init(AcquisitionMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的采集周期 ID。
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录完成的采集周期。
pub fn record_cycle_completed() {
    metrics().cycles_completed.fetch_add(1, Ordering::Relaxed);
}

/// 记录寄存器读取成功。
pub fn record_register_read_ok() {
    metrics().register_reads_ok.fetch_add(1, Ordering::Relaxed);
}

/// 记录寄存器读取失败（以 0.0 占位）。
pub fn record_register_read_failed() {
    metrics()
        .register_reads_failed
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录总线连接失败。
pub fn record_connection_failure() {
    metrics()
        .connection_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录上报成功（HTTP 201）。
pub fn record_delivery_ok() {
    metrics().deliveries_ok.fetch_add(1, Ordering::Relaxed);
}

/// 记录上报失败（非 201 或传输错误）。
pub fn record_delivery_failed() {
    metrics().deliveries_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录未配置端点的设备。
pub fn record_unknown_device() {
    metrics().unknown_devices.fetch_add(1, Ordering::Relaxed);
}
