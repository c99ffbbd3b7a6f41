//! Modbus RTU 串口客户端实现
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let connector = ModbusRtuConnector::new(BusConfig::default());
//! let mut bus = connector.connect().await?;
//! let words = bus.read_registers(RegisterFunction::Holding, 1, 3960, 2).await?;
//! bus.close().await?;
//! ```

use crate::bus::{BusConnector, RegisterBus};
use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::{BusConfig, Parity, RegisterFunction};
use std::time::Duration;
use tokio_modbus::client::{Context, rtu};
use tokio_modbus::prelude::*;
use tokio_serial::{DataBits, SerialPortBuilderExt, StopBits};
use tracing::debug;

/// 基于串口的 Modbus RTU 连接器
#[derive(Debug, Clone)]
pub struct ModbusRtuConnector {
    config: BusConfig,
}

impl ModbusRtuConnector {
    pub fn new(config: BusConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BusConnector for ModbusRtuConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterBus>, ProtocolError> {
        let builder = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(data_bits(self.config.data_bits)?)
            .parity(parity(self.config.parity))
            .stop_bits(stop_bits(self.config.stop_bits)?)
            .timeout(self.config.timeout);

        let stream = builder
            .open_native_async()
            .map_err(|e| ProtocolError::Connection(format!("{}: {}", self.config.port, e)))?;

        debug!(
            port = %self.config.port,
            baud_rate = self.config.baud_rate,
            "serial port opened"
        );

        // 从站地址在每次读取前设置
        let ctx = rtu::attach(stream);
        Ok(Box::new(ModbusRtuBus {
            ctx,
            timeout: self.config.timeout,
        }))
    }

    fn port(&self) -> &str {
        &self.config.port
    }
}

/// 已打开的 RTU 会话
pub struct ModbusRtuBus {
    ctx: Context,
    timeout: Duration,
}

#[async_trait]
impl RegisterBus for ModbusRtuBus {
    async fn read_registers(
        &mut self,
        function: RegisterFunction,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        self.ctx.set_slave(Slave(slave_id));

        let response = match function {
            RegisterFunction::Holding => {
                tokio::time::timeout(self.timeout, self.ctx.read_holding_registers(address, count))
                    .await
            }
            RegisterFunction::Input => {
                tokio::time::timeout(self.timeout, self.ctx.read_input_registers(address, count))
                    .await
            }
        };

        let registers = response
            .map_err(|_| {
                ProtocolError::Timeout(format!(
                    "no response within {} ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| ProtocolError::Modbus(e.to_string()))?
            .map_err(|e| ProtocolError::Exception(format!("{:?}", e)))?;

        Ok(registers)
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.ctx
            .disconnect()
            .await
            .map_err(|e| ProtocolError::Modbus(e.to_string()))
    }
}

fn data_bits(bits: u8) -> Result<DataBits, ProtocolError> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(ProtocolError::Connection(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<StopBits, ProtocolError> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(ProtocolError::Connection(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    }
}
