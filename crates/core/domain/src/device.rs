use std::time::Duration;

/// 单个字段的寄存器映射（字段名 → 起始寄存器地址）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegister {
    pub name: String,
    pub address: u16,
}

impl FieldRegister {
    pub fn new(name: impl Into<String>, address: u16) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// 总线上一块电能表的配置。
///
/// `fields` 的顺序即读数向量中值的顺序，是与远端消费方的约定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// 从站地址（1-247）
    pub slave_id: u8,
    pub fields: Vec<FieldRegister>,
}

impl DeviceConfig {
    pub fn new(slave_id: u8, fields: Vec<FieldRegister>) -> Self {
        Self { slave_id, fields }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

/// 串口校验位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    None,
    #[default]
    Even,
    Odd,
}

impl Parity {
    /// 解析 `N` / `E` / `O`（大小写不敏感）。
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "N" | "NONE" => Some(Self::None),
            "E" | "EVEN" => Some(Self::Even),
            "O" | "ODD" => Some(Self::Odd),
            _ => None,
        }
    }
}

/// Modbus 读功能码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterFunction {
    /// 读保持寄存器 (0x03)
    #[default]
    Holding,
    /// 读输入寄存器 (0x04)
    Input,
}

impl RegisterFunction {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            3 => Some(Self::Holding),
            4 => Some(Self::Input),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Holding => 3,
            Self::Input => 4,
        }
    }
}

/// 串口总线参数，所有设备共用一份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// 单次总线调用超时
    pub timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 19200,
            data_bits: 8,
            parity: Parity::Even,
            stop_bits: 1,
            timeout: Duration::from_secs(2),
        }
    }
}
