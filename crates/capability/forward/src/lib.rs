//! # 上报能力模块
//!
//! 将一台设备的读数向量作为一个 contentInstance 提交到该设备的 oneM2M 容器。
//!
//! 请求格式：
//!
//! ```text
//! POST <endpoint.url>
//! X-M2M-Origin: <username>:<password>
//! Content-type: application/<format>;ty=4
//!
//! { "m2m:cin": { "con": "[ts, v1, v2, ...]", "lbl": [...], "cnf": "text" } }
//! ```
//!
//! 只有 201 视为成功；失败只记录日志，不在本次调用内重试。

mod error;
mod onem2m;

pub use error::ForwardError;
pub use onem2m::{
    CONTENT_FORMAT, CONTENT_INSTANCE_TYPE, ContentInstance, ContentInstanceRequest, ORIGIN_HEADER,
    OneM2mForwarder, content_instance_body, content_type,
};

use async_trait::async_trait;
use domain::ReadingVector;

/// 成功上报的响应。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub body: String,
}

/// 读数向量接收端抽象。
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn submit(&self, slave_id: u8, vector: &ReadingVector) -> Result<Delivery, ForwardError>;
}
