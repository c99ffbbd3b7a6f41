//! 总线抽象
//!
//! 串口总线是半双工的，一个会话同一时刻只服务一次轮询：
//! 连接器按需建立会话，轮询器在一台设备的全部字段读完后关闭它。

use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::RegisterFunction;

/// 已建立的总线会话。
#[async_trait]
pub trait RegisterBus: Send {
    /// 读取 `count` 个寄存器。
    async fn read_registers(
        &mut self,
        function: RegisterFunction,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError>;

    /// 关闭会话。
    async fn close(&mut self) -> Result<(), ProtocolError>;
}

/// 总线连接器：每次调用建立一个新会话。
#[async_trait]
pub trait BusConnector: Send + Sync {
    /// 建立会话；失败时返回 [`ProtocolError::Connection`]。
    async fn connect(&self) -> Result<Box<dyn RegisterBus>, ProtocolError>;

    /// 日志中使用的端口标识。
    fn port(&self) -> &str;
}
