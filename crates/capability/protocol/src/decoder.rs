//! 寄存器解码
//!
//! 电能表以两个 16 位寄存器表示一个 IEEE-754 单精度浮点数，
//! 且寄存器顺序与地址顺序相反：第二个寄存器是浮点数的高位字。

use crate::error::ProtocolError;

/// 一个浮点数占用的寄存器数量。
pub const FLOAT_REGISTER_COUNT: u16 = 2;

/// 将总线返回的 `(high, low)` 两个字解码为 f32。
///
/// `high` 为起始地址处的寄存器，`low` 为下一个寄存器。
/// 按 `low` 在前、`high` 在后拼成 4 字节，再以大端解释。
pub fn decode_f32(high: u16, low: u16) -> f32 {
    let [b0, b1] = low.to_be_bytes();
    let [b2, b3] = high.to_be_bytes();
    f32::from_be_bytes([b0, b1, b2, b3])
}

/// 从寄存器切片解码；字数不足时报错，由调用方决定占位。
pub fn decode_registers(registers: &[u16]) -> Result<f32, ProtocolError> {
    match registers {
        [high, low, ..] => Ok(decode_f32(*high, *low)),
        _ => Err(ProtocolError::DataParse(format!(
            "need {} registers for float32, got {}",
            FLOAT_REGISTER_COUNT,
            registers.len()
        ))),
    }
}
