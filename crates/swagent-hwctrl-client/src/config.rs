//! Client table configuration file.
//!
//! ```toml
//! base_port = 5931
//! host = "::1"
//! request_timeout_ms = 30000
//!
//! [switches.1]
//! switch_index = 0
//!
//! [switches.2]
//! switch_index = 1
//! switch_type = "fabric"
//! ```

use crate::error::{HwCtrlError, HwCtrlResult};
use crate::factory::ClientOptions;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use swagent_types::{SwitchId, SwitchInfo, SwitchType};

/// One managed switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEntry {
    pub switch_index: u16,

    #[serde(default)]
    pub switch_type: SwitchType,
}

/// Complete client table configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTableConfig {
    /// Port of the hw agent with switch index 0
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Address the hw agents listen on
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retries after the first attempt of a failed request
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Switch id (as a string key) to switch entry
    #[serde(default)]
    pub switches: BTreeMap<String, SwitchEntry>,
}

fn default_base_port() -> u16 {
    5931
}

fn default_host() -> IpAddr {
    ClientOptions::default().host
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_retries() -> u32 {
    2
}

impl Default for ClientTableConfig {
    fn default() -> Self {
        Self {
            base_port: default_base_port(),
            host: default_host(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retries: default_retries(),
            switches: BTreeMap::new(),
        }
    }
}

impl ClientTableConfig {
    /// Loads and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> HwCtrlResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| HwCtrlError::local(format!("Failed to read {}", path.display()), e))?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> HwCtrlResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HwCtrlError::invalid_config("file", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> HwCtrlResult<String> {
        toml::to_string_pretty(self).map_err(|e| HwCtrlError::invalid_config("file", e.to_string()))
    }

    pub fn validate(&self) -> HwCtrlResult<()> {
        if self.connect_timeout_ms == 0 {
            return Err(HwCtrlError::invalid_config(
                "connect_timeout_ms",
                "must be > 0",
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(HwCtrlError::invalid_config(
                "request_timeout_ms",
                "must be > 0",
            ));
        }

        let mut ports: HashMap<u32, &str> = HashMap::new();
        for (key, entry) in &self.switches {
            key.parse::<i64>().map_err(|_| {
                HwCtrlError::invalid_config(format!("switches.{}", key), "switch id must be an integer")
            })?;
            let port = u32::from(self.base_port) + u32::from(entry.switch_index);
            if port > u32::from(u16::MAX) {
                return Err(HwCtrlError::invalid_config(
                    format!("switches.{}", key),
                    format!("port {} out of range", port),
                ));
            }
            if let Some(other) = ports.insert(port, key) {
                return Err(HwCtrlError::invalid_config(
                    format!("switches.{}", key),
                    format!("port {} already used by switch {}", port, other),
                ));
            }
        }
        Ok(())
    }

    /// Switch id to switch info, as consumed by the client table.
    pub fn switch_infos(&self) -> HwCtrlResult<BTreeMap<SwitchId, SwitchInfo>> {
        self.switches
            .iter()
            .map(|(key, entry)| {
                let id = key.parse::<i64>().map_err(|_| {
                    HwCtrlError::invalid_config(
                        format!("switches.{}", key),
                        "switch id must be an integer",
                    )
                })?;
                let info = SwitchInfo::new(entry.switch_index).with_type(entry.switch_type);
                Ok((SwitchId::new(id), info))
            })
            .collect()
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            host: self.host,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retries: self.retries,
        }
    }
}
