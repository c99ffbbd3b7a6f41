//! 设备轮询
//!
//! 每台设备每个周期建立一次总线会话，逐字段读取并解码。
//! 单个寄存器读取失败只影响该字段（以 0.0 占位），
//! 连接失败则该设备本周期返回空读数集合。

use crate::bus::{BusConnector, RegisterBus};
use crate::decoder::{FLOAT_REGISTER_COUNT, decode_registers};
use crate::error::ProtocolError;
use domain::{DeviceConfig, DeviceReadings, FieldRegister, Reading, RegisterFunction};
use em_telemetry::{record_connection_failure, record_register_read_failed, record_register_read_ok};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 设备轮询器
#[derive(Clone)]
pub struct DevicePoller {
    connector: Arc<dyn BusConnector>,
    function: RegisterFunction,
    register_count: u16,
}

impl DevicePoller {
    pub fn new(connector: Arc<dyn BusConnector>) -> Self {
        Self {
            connector,
            function: RegisterFunction::Holding,
            register_count: FLOAT_REGISTER_COUNT,
        }
    }

    /// 设置读功能码（默认读保持寄存器）。
    pub fn with_function(mut self, function: RegisterFunction) -> Self {
        self.function = function;
        self
    }

    /// 轮询一台设备的全部字段。
    ///
    /// 不返回错误：连接失败时结果为空，字段失败时该字段为 0.0。
    pub async fn poll(&self, device: &DeviceConfig) -> DeviceReadings {
        let mut readings = DeviceReadings::new(device.slave_id);

        let mut bus = match self.connector.connect().await {
            Ok(bus) => bus,
            Err(e) => {
                record_connection_failure();
                warn!(
                    slave = device.slave_id,
                    port = %self.connector.port(),
                    error = %e,
                    "failed to connect to serial bus"
                );
                return readings;
            }
        };

        for field in &device.fields {
            let value = match self.read_field(bus.as_mut(), device.slave_id, field).await {
                Ok(value) => {
                    record_register_read_ok();
                    value
                }
                Err(e) => {
                    record_register_read_failed();
                    warn!(
                        slave = device.slave_id,
                        field = %field.name,
                        address = field.address,
                        error = %e,
                        "failed to read register, using 0.0"
                    );
                    0.0
                }
            };
            readings.push(Reading::new(field.name.clone(), value));
        }

        if let Err(e) = bus.close().await {
            debug!(
                slave = device.slave_id,
                error = %e,
                "failed to close serial bus"
            );
        }

        info!(
            slave = device.slave_id,
            readings = ?readings.iter().map(|r| (r.field.as_str(), r.value)).collect::<Vec<_>>(),
            "device polled"
        );
        readings
    }

    /// 读取并解码单个字段。
    async fn read_field(
        &self,
        bus: &mut dyn RegisterBus,
        slave_id: u8,
        field: &FieldRegister,
    ) -> Result<f64, ProtocolError> {
        let registers = bus
            .read_registers(self.function, slave_id, field.address, self.register_count)
            .await?;

        debug!(
            slave = slave_id,
            field = %field.name,
            address = field.address,
            values = ?registers,
            "read modbus registers"
        );

        let value = decode_registers(&registers)?;
        Ok(f64::from(value))
    }
}
