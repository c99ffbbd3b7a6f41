//! 采集网关运行配置加载。

mod meters;

pub use meters::{EndpointEntry, MeterEntry, MeterTable, MeterTableFile, RegisterEntry};

use domain::{BusConfig, Credentials, Parity, RegisterFunction};
use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("meter table error: {0}")]
    File(String),
}

/// 采集网关运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bus: BusConfig,
    /// 读功能码（只由轮询器使用）
    pub function: RegisterFunction,
    pub read_interval: Duration,
    pub data_format: String,
    pub credentials: Credentials,
    pub meters: MeterTable,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("EM_SERIAL_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
        let baud_rate = read_u32_with_default("EM_SERIAL_BAUD_RATE", 19200)?;
        let data_bits = read_u8_with_default("EM_SERIAL_DATA_BITS", 8)?;
        if !(5..=8).contains(&data_bits) {
            return Err(invalid("EM_SERIAL_DATA_BITS", data_bits));
        }
        let parity = match read_optional("EM_SERIAL_PARITY") {
            Some(code) => {
                Parity::from_code(&code).ok_or_else(|| invalid("EM_SERIAL_PARITY", code))?
            }
            None => Parity::Even,
        };
        let stop_bits = read_u8_with_default("EM_SERIAL_STOP_BITS", 1)?;
        if !(1..=2).contains(&stop_bits) {
            return Err(invalid("EM_SERIAL_STOP_BITS", stop_bits));
        }
        let timeout_ms = read_u64_with_default("EM_SERIAL_TIMEOUT_MS", 2000)?;
        let function_code = read_u8_with_default("EM_MODBUS_FUNCTION_CODE", 3)?;
        let function = RegisterFunction::from_code(function_code)
            .ok_or_else(|| invalid("EM_MODBUS_FUNCTION_CODE", function_code))?;
        let read_interval_seconds = read_u64_with_default("EM_READ_INTERVAL_SECONDS", 60)?;
        if read_interval_seconds == 0 {
            return Err(invalid("EM_READ_INTERVAL_SECONDS", read_interval_seconds));
        }
        let data_format = env::var("EM_DATA_FORMAT").unwrap_or_else(|_| "json".to_string());
        let username =
            env::var("ONEM2M_USERNAME").unwrap_or_else(|_| "default_user".to_string());
        let password =
            env::var("ONEM2M_PASSWORD").unwrap_or_else(|_| "default_pass".to_string());
        let meters = match read_optional("EM_METERS_FILE") {
            Some(path) => MeterTable::from_file(path)?,
            None => MeterTable::builtin(),
        };

        Ok(Self {
            bus: BusConfig {
                port,
                baud_rate,
                data_bits,
                parity,
                stop_bits,
                timeout: Duration::from_millis(timeout_ms),
            },
            function,
            read_interval: Duration::from_secs(read_interval_seconds),
            data_format,
            credentials: Credentials::new(username, password),
            meters,
        })
    }

    /// 被轮询但没有上报端点的设备。
    pub fn devices_without_endpoint(&self) -> Vec<u8> {
        self.meters.devices_without_endpoint()
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid(key.to_string(), value.to_string())
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
