use std::collections::BTreeMap;
use std::fmt;

/// 单台设备的远端资源（contentInstance 容器 URL）与分类标签。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub url: String,
    pub labels: Vec<String>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            url: url.into(),
            labels,
        }
    }

    /// 日志中使用的资源名：优先取第二个标签（资源名标签），否则回退到 URL。
    pub fn display_name(&self) -> &str {
        self.labels
            .get(1)
            .map(String::as_str)
            .unwrap_or(self.url.as_str())
    }
}

/// 按从站地址索引的端点表。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTable {
    endpoints: BTreeMap<u8, EndpointConfig>,
}

impl EndpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slave_id: u8, endpoint: EndpointConfig) -> Option<EndpointConfig> {
        self.endpoints.insert(slave_id, endpoint)
    }

    pub fn get(&self, slave_id: u8) -> Option<&EndpointConfig> {
        self.endpoints.get(&slave_id)
    }

    pub fn contains(&self, slave_id: u8) -> bool {
        self.endpoints.contains_key(&slave_id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl FromIterator<(u8, EndpointConfig)> for EndpointTable {
    fn from_iter<T: IntoIterator<Item = (u8, EndpointConfig)>>(iter: T) -> Self {
        Self {
            endpoints: iter.into_iter().collect(),
        }
    }
}

/// 上报凭据（外部提供，进程内只读）。
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `X-M2M-Origin` 头取值：`username:password`。
    pub fn origin(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
