//! # 协议通信能力模块
//!
//! 通过串口 Modbus RTU 从多块电能表读取寄存器：
//! - **Decoder**：两个 16 位寄存器 → f32（寄存器字序交换）
//! - **BusConnector / RegisterBus**：总线会话抽象
//! - **ModbusRtuConnector**：基于 tokio-serial 的 RTU 实现
//! - **DevicePoller**：逐字段读取，故障按寄存器隔离
//!
//! ## 架构设计
//!
//! ```text
//! Scheduler
//!     │
//!     ▼
//! DevicePoller ──connect()──▶ BusConnector (ModbusRtuConnector)
//!     │                              │
//!     │◀──────── RegisterBus ────────┘
//!     ▼
//! decode_f32 (每个字段)
//!     │
//!     ▼
//! DeviceReadings
//! ```

mod bus;
mod decoder;
mod error;
mod poller;
mod rtu;

pub use bus::{BusConnector, RegisterBus};
pub use decoder::{FLOAT_REGISTER_COUNT, decode_f32, decode_registers};
pub use error::ProtocolError;
pub use poller::DevicePoller;
pub use rtu::{ModbusRtuBus, ModbusRtuConnector};
