//! 采集调度：周期轮询所有设备 → 组装读数向量 → 逐台上报。
//!
//! 每个周期只取一次时间戳，本周期所有设备共用。周期结束后固定休眠
//! `interval`，实际周期为 `interval + 处理耗时`。

use domain::{DeviceConfig, ReadingVector, now_epoch_secs};
use em_forward::{ContentSink, Delivery, ForwardError};
use em_protocol::DevicePoller;
use em_telemetry::{metrics, new_cycle_id, record_cycle_completed};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, info, warn};

/// 默认采集间隔。
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// 单台设备在一个周期内的处理结果。
#[derive(Debug)]
pub struct DeviceOutcome {
    pub slave_id: u8,
    pub vector: ReadingVector,
    pub delivery: Result<Delivery, ForwardError>,
}

/// 一个采集周期的处理结果。
#[derive(Debug)]
pub struct CycleReport {
    pub timestamp: i64,
    pub devices: Vec<DeviceOutcome>,
}

impl CycleReport {
    pub fn delivered(&self) -> usize {
        self.devices
            .iter()
            .filter(|outcome| outcome.delivery.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.devices.len() - self.delivered()
    }
}

/// 采集调度器。
pub struct Scheduler {
    devices: Arc<[DeviceConfig]>,
    poller: DevicePoller,
    sink: Arc<dyn ContentSink>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        devices: impl Into<Arc<[DeviceConfig]>>,
        poller: DevicePoller,
        sink: Arc<dyn ContentSink>,
    ) -> Self {
        Self {
            devices: devices.into(),
            poller,
            sink,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        &self.devices
    }

    /// 执行一个周期：按声明顺序轮询并上报每台设备。
    pub async fn run_cycle(&self, timestamp: i64) -> CycleReport {
        self.run_cycle_until(timestamp, None).await
    }

    /// 持续运行，直到 `shutdown` 变为 `true`。
    ///
    /// 停止信号不会打断正在处理的设备；收到信号后不再开始新的设备，
    /// 周期间的休眠会被立即唤醒。
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            devices = self.devices.len(),
            interval_secs = self.interval.as_secs(),
            "acquisition loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let timestamp = now_epoch_secs();
            let cycle_id = new_cycle_id();
            let span = tracing::info_span!("cycle", cycle_id = %cycle_id, timestamp);
            let report = self
                .run_cycle_until(timestamp, Some(&shutdown))
                .instrument(span)
                .await;

            info!(
                timestamp = report.timestamp,
                delivered = report.delivered(),
                failed = report.failed(),
                metrics = ?metrics().snapshot(),
                "acquisition cycle finished"
            );

            if *shutdown.borrow() {
                break;
            }

            info!(
                wait_secs = self.interval.as_secs(),
                "waiting before next read"
            );
            // 发送端已关闭时也停止，避免空转
            let sender_closed = tokio::select! {
                _ = tokio::time::sleep(self.interval) => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            if sender_closed {
                break;
            }
        }

        info!("acquisition loop stopped");
    }

    async fn run_cycle_until(
        &self,
        timestamp: i64,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> CycleReport {
        let mut devices = Vec::with_capacity(self.devices.len());

        for device in self.devices.iter() {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                warn!(
                    slave = device.slave_id,
                    "shutdown requested, skipping remaining devices"
                );
                break;
            }
            devices.push(self.process_device(timestamp, device).await);
        }

        record_cycle_completed();
        CycleReport { timestamp, devices }
    }

    async fn process_device(&self, timestamp: i64, device: &DeviceConfig) -> DeviceOutcome {
        info!(slave = device.slave_id, "reading meter");
        let readings = self.poller.poll(device).await;
        let vector = ReadingVector::assemble(timestamp, device, &readings);

        // 结果已由上报器记录日志，这里只保留用于周期汇总
        let delivery = self.sink.submit(device.slave_id, &vector).await;
        DeviceOutcome {
            slave_id: device.slave_id,
            vector,
            delivery,
        }
    }
}
