//! 电表表：从站地址、寄存器映射与上报端点。

use crate::ConfigError;
use domain::{DeviceConfig, EndpointConfig, EndpointTable, FieldRegister};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Modbus 从站地址上限。
const MAX_SLAVE_ID: u8 = 247;

const DEFAULT_CSE_BASE: &str = "http://onem2m.iiit.ac.in:443/~/in-cse/in-name/AE-SR/SR-EM";

/// 电表表文件。
#[derive(Debug, Clone, Deserialize)]
pub struct MeterTableFile {
    pub meters: Vec<MeterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterEntry {
    pub slave_id: u8,
    pub registers: Vec<RegisterEntry>,
    #[serde(default)]
    pub endpoint: Option<EndpointEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterEntry {
    pub name: String,
    pub address: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointEntry {
    pub url: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// 校验后的电表表：按声明顺序的设备列表 + 端点表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterTable {
    pub devices: Vec<DeviceConfig>,
    pub endpoints: EndpointTable,
}

impl MeterTable {
    /// 从 JSON 文件加载。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        let file: MeterTableFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        Self::try_from(file)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: MeterTableFile =
            serde_json::from_str(json).map_err(|e| ConfigError::File(e.to_string()))?;
        Self::try_from(file)
    }

    /// 现场部署使用的内置电表表。
    pub fn builtin() -> Self {
        let three_phase: [(&str, u16); 6] = [
            ("Energy", 158),
            ("Power", 100),
            ("Voltage", 140),
            ("Current", 148),
            ("Frequency", 156),
            ("PowerFactor", 116),
        ];
        let meters: [(u8, &[(&str, u16)], &str, &str); 3] = [
            (
                1,
                &[("Energy", 3960), ("Power", 3902), ("Current", 3912)],
                "SR-EM-KH04-00",
                "V1.0.0",
            ),
            (2, &three_phase, "SR-EM-KH04-01", "V2.0.0"),
            (3, &three_phase, "SR-EM-KH04-02", "V2.0.0"),
        ];

        let mut devices = Vec::with_capacity(meters.len());
        let mut endpoints = EndpointTable::new();
        for (slave_id, registers, resource, version) in meters {
            devices.push(DeviceConfig::new(
                slave_id,
                registers
                    .iter()
                    .map(|(name, address)| FieldRegister::new(*name, *address))
                    .collect(),
            ));
            endpoints.insert(
                slave_id,
                EndpointConfig::new(
                    format!("{}/{}/Data", DEFAULT_CSE_BASE, resource),
                    vec![
                        "AE-SR-EM".to_string(),
                        resource.to_string(),
                        version.to_string(),
                        format!("SR-EM-{}", version),
                    ],
                ),
            );
        }

        Self { devices, endpoints }
    }

    /// 被轮询但没有端点的设备（上报时会被跳过）。
    pub fn devices_without_endpoint(&self) -> Vec<u8> {
        self.devices
            .iter()
            .map(|device| device.slave_id)
            .filter(|slave_id| !self.endpoints.contains(*slave_id))
            .collect()
    }
}

impl TryFrom<MeterTableFile> for MeterTable {
    type Error = ConfigError;

    fn try_from(file: MeterTableFile) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let mut devices = Vec::with_capacity(file.meters.len());
        let mut endpoints = EndpointTable::new();

        for meter in file.meters {
            let key = format!("meters[{}]", meter.slave_id);
            if meter.slave_id == 0 || meter.slave_id > MAX_SLAVE_ID {
                return Err(ConfigError::Invalid(
                    format!("{}.slave_id", key),
                    meter.slave_id.to_string(),
                ));
            }
            if !seen.insert(meter.slave_id) {
                return Err(ConfigError::Invalid(
                    "meters.slave_id".to_string(),
                    format!("duplicate {}", meter.slave_id),
                ));
            }

            let mut names = HashSet::new();
            let mut fields = Vec::with_capacity(meter.registers.len());
            for register in meter.registers {
                if register.name.trim().is_empty() || !names.insert(register.name.clone()) {
                    return Err(ConfigError::Invalid(
                        format!("{}.registers", key),
                        register.name,
                    ));
                }
                fields.push(FieldRegister::new(register.name, register.address));
            }

            if let Some(endpoint) = meter.endpoint {
                if endpoint.url.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        format!("{}.endpoint.url", key),
                        endpoint.url,
                    ));
                }
                endpoints.insert(
                    meter.slave_id,
                    EndpointConfig::new(endpoint.url, endpoint.labels),
                );
            }
            devices.push(DeviceConfig::new(meter.slave_id, fields));
        }

        Ok(Self { devices, endpoints })
    }
}
