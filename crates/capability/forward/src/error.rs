/// 上报错误。
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// 设备未配置端点，未发起网络请求
    #[error("no endpoint configured for device {0}")]
    UnknownDevice(u8),
    /// 远端返回非 201
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// DNS、连接、超时等传输层错误
    #[error("transport error: {0}")]
    Transport(String),
    /// HTTP 客户端构造失败
    #[error("http client error: {0}")]
    Client(String),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ForwardError {
    /// 是否为投递失败（非 201 或传输错误）。
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Transport(_))
    }
}
