use crate::device::DeviceConfig;
use std::fmt;

/// 读数保留的小数位数对应的倍率（3 位小数）。
const READING_SCALE: f64 = 1000.0;

/// 单个字段的解码读数（已按 3 位小数取整）。
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub field: String,
    pub value: f64,
}

impl Reading {
    pub fn new(field: impl Into<String>, value: f64) -> Self {
        Self {
            field: field.into(),
            value: round_reading(value),
        }
    }
}

/// 一台设备在一个周期内的读数集合。
///
/// 连接失败时为空；连接成功时覆盖所有请求字段（读失败字段为 0.0）。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceReadings {
    pub slave_id: u8,
    readings: Vec<Reading>,
}

impl DeviceReadings {
    pub fn new(slave_id: u8) -> Self {
        Self {
            slave_id,
            readings: Vec::new(),
        }
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|reading| reading.field == field)
            .map(|reading| reading.value)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }
}

/// 上报向量：`[timestamp, v1, v2, ...]`，值顺序与设备字段声明顺序一致。
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingVector {
    timestamp: i64,
    values: Vec<f64>,
}

impl ReadingVector {
    /// 按设备字段顺序组装向量；缺失的字段补 0.0，长度恒为 `1 + field_count`。
    pub fn assemble(timestamp: i64, device: &DeviceConfig, readings: &DeviceReadings) -> Self {
        let values = device
            .field_names()
            .map(|name| readings.get(name).unwrap_or(0.0))
            .collect();
        Self { timestamp, values }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 含时间戳在内的元素个数。
    pub fn len(&self) -> usize {
        self.values.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// contentInstance `con` 字段的字符串形式。
    pub fn to_content(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReadingVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.timestamp)?;
        for value in &self.values {
            write!(f, ", {}", format_value(*value))?;
        }
        write!(f, "]")
    }
}

/// 单个值的文本形式：最短往返表示，整数值保留 ".0"；
/// 非有限值写作 `nan` / `inf` / `-inf`，指数形式带符号且至少两位（`1e+16`、`1e-05`）。
fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

/// 按 3 位小数四舍五入。
pub fn round_reading(value: f64) -> f64 {
    (value * READING_SCALE).round() / READING_SCALE
}

/// 当前 Unix 时间戳（秒）。
pub fn now_epoch_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
