//! 协议错误类型定义

/// 协议通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误（无法建立总线会话）
    #[error("connection error: {0}")]
    Connection(String),

    /// Modbus 传输错误
    #[error("modbus error: {0}")]
    Modbus(String),

    /// 从站返回异常响应
    #[error("modbus exception: {0}")]
    Exception(String),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),
}

impl ProtocolError {
    /// 是否为连接级错误（整台设备本周期放弃）。
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
