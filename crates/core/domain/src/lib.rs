//! 采集网关领域模型：设备/总线/端点配置与读数。
//!
//! 所有配置类型在启动时构造一次，之后只读共享。

pub mod device;
pub mod endpoint;
pub mod reading;

pub use device::{BusConfig, DeviceConfig, FieldRegister, Parity, RegisterFunction};
pub use endpoint::{Credentials, EndpointConfig, EndpointTable};
pub use reading::{DeviceReadings, Reading, ReadingVector, now_epoch_secs, round_reading};
