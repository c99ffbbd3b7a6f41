use crate::error::ForwardError;
use crate::{ContentSink, Delivery};
use async_trait::async_trait;
use domain::{Credentials, EndpointConfig, EndpointTable, ReadingVector};
use em_telemetry::{record_delivery_failed, record_delivery_ok, record_unknown_device};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 来源身份请求头。
pub const ORIGIN_HEADER: &str = "X-M2M-Origin";
/// contentInstance 资源类型。
pub const CONTENT_INSTANCE_TYPE: u8 = 4;
/// `cnf` 字段取值。
pub const CONTENT_FORMAT: &str = "text";

const DEFAULT_DATA_FORMAT: &str = "json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// contentInstance 创建请求体。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentInstanceRequest {
    #[serde(rename = "m2m:cin")]
    pub cin: ContentInstance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentInstance {
    pub con: String,
    pub lbl: Vec<String>,
    pub cnf: String,
}

/// 构造请求体：读数向量字符串 + 设备标签 + 固定内容格式。
pub fn content_instance_body(
    endpoint: &EndpointConfig,
    vector: &ReadingVector,
) -> ContentInstanceRequest {
    ContentInstanceRequest {
        cin: ContentInstance {
            con: vector.to_content(),
            lbl: endpoint.labels.clone(),
            cnf: CONTENT_FORMAT.to_string(),
        },
    }
}

fn encode_body(endpoint: &EndpointConfig, vector: &ReadingVector) -> Result<Vec<u8>, ForwardError> {
    Ok(serde_json::to_vec(&content_instance_body(endpoint, vector))?)
}

/// `Content-type` 头：`application/<format>;ty=4`。
pub fn content_type(data_format: &str) -> String {
    format!("application/{};ty={}", data_format, CONTENT_INSTANCE_TYPE)
}

/// oneM2M 上报器。
#[derive(Clone)]
pub struct OneM2mForwarder {
    client: reqwest::Client,
    endpoints: Arc<EndpointTable>,
    credentials: Arc<Credentials>,
    data_format: String,
}

impl OneM2mForwarder {
    pub fn new(
        endpoints: Arc<EndpointTable>,
        credentials: Arc<Credentials>,
    ) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ForwardError::Client(err.to_string()))?;
        Ok(Self {
            client,
            endpoints,
            credentials,
            data_format: DEFAULT_DATA_FORMAT.to_string(),
        })
    }

    /// 设置 `Content-type` 中的序列化格式（默认 json）。
    pub fn with_data_format(mut self, data_format: impl Into<String>) -> Self {
        self.data_format = data_format.into();
        self
    }
}

#[async_trait]
impl ContentSink for OneM2mForwarder {
    async fn submit(&self, slave_id: u8, vector: &ReadingVector) -> Result<Delivery, ForwardError> {
        let Some(endpoint) = self.endpoints.get(slave_id) else {
            record_unknown_device();
            warn!(
                target: "em.forward",
                slave = slave_id,
                "no endpoint configured, skipping delivery"
            );
            return Err(ForwardError::UnknownDevice(slave_id));
        };

        let body = match encode_body(endpoint, vector) {
            Ok(body) => body,
            Err(err) => {
                record_delivery_failed();
                warn!(
                    target: "em.forward",
                    slave = slave_id,
                    resource = %endpoint.display_name(),
                    error = %err,
                    "content instance encoding failed"
                );
                return Err(err);
            }
        };
        info!(
            target: "em.forward",
            slave = slave_id,
            resource = %endpoint.display_name(),
            content = %vector,
            "sending content instance"
        );

        let response = match self
            .client
            .post(&endpoint.url)
            .header(ORIGIN_HEADER, self.credentials.origin())
            .header(CONTENT_TYPE, content_type(&self.data_format))
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                record_delivery_failed();
                warn!(
                    target: "em.forward",
                    slave = slave_id,
                    resource = %endpoint.display_name(),
                    url = %endpoint.url,
                    error = %err,
                    "content instance delivery failed"
                );
                return Err(ForwardError::Transport(err.to_string()));
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        if status == StatusCode::CREATED {
            record_delivery_ok();
            info!(
                target: "em.forward",
                slave = slave_id,
                resource = %endpoint.display_name(),
                status = status.as_u16(),
                body = %text,
                "content instance created"
            );
            Ok(Delivery {
                status: status.as_u16(),
                body: text,
            })
        } else {
            record_delivery_failed();
            warn!(
                target: "em.forward",
                slave = slave_id,
                resource = %endpoint.display_name(),
                url = %endpoint.url,
                status = status.as_u16(),
                body = %text,
                "content instance rejected"
            );
            Err(ForwardError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
