//! 采集链路装配模块
//!
//! 将串口连接器、设备轮询器、oneM2M 上报器与调度器按配置组装在一起。

use em_acquisition::Scheduler;
use em_config::AppConfig;
use em_forward::{ForwardError, OneM2mForwarder};
use em_protocol::{DevicePoller, ModbusRtuConnector};
use std::sync::Arc;
use tracing::{info, warn};

/// 按配置构造调度器。
pub fn build_scheduler(config: &AppConfig) -> Result<Scheduler, ForwardError> {
    let missing = config.devices_without_endpoint();
    if !missing.is_empty() {
        warn!(
            slaves = ?missing,
            "devices without endpoint will be polled but not forwarded"
        );
    }

    let connector = Arc::new(ModbusRtuConnector::new(config.bus.clone()));
    let poller = DevicePoller::new(connector).with_function(config.function);
    let forwarder = OneM2mForwarder::new(
        Arc::new(config.meters.endpoints.clone()),
        Arc::new(config.credentials.clone()),
    )?
    .with_data_format(config.data_format.clone());

    info!(
        port = %config.bus.port,
        baud_rate = config.bus.baud_rate,
        function_code = config.function.code(),
        devices = config.meters.devices.len(),
        endpoints = config.meters.endpoints.len(),
        "acquisition pipeline assembled"
    );

    Ok(Scheduler::new(
        config.meters.devices.clone(),
        poller,
        Arc::new(forwarder),
    )
    .with_interval(config.read_interval))
}
