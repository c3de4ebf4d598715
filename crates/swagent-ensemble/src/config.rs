//! Agent configuration and its persistence.
//!
//! The agent config is JSON with a `sw` section (switch configuration) and
//! a `platform` section. Only the parts the ensemble reads are typed; any
//! other keys are carried through unchanged so a rewritten file still
//! holds everything the runtime needs.

use crate::error::{EnsembleError, EnsembleResult};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use swagent_types::{PortId, SwitchId, SwitchInfo};
use tracing::debug;

/// File the runtime reads its configuration from at start.
pub const DEFAULT_CONFIG_FILE: &str = "agent.conf";

/// Port loopback mode used when scripting link transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortLoopbackMode {
    #[default]
    None,
    Mac,
    Phy,
    NifPort,
}

/// Per-port switch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConfig {
    #[serde(rename = "logicalID")]
    pub logical_id: PortId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub loopback_mode: PortLoopbackMode,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PortConfig {
    pub fn new(logical_id: PortId) -> Self {
        Self {
            logical_id,
            name: None,
            enabled: false,
            loopback_mode: PortLoopbackMode::None,
            extra: Map::new(),
        }
    }

    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn with_loopback_mode(mut self, mode: PortLoopbackMode) -> Self {
        self.loopback_mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSettings {
    /// Managed switches of this agent.
    #[serde(default, deserialize_with = "deserialize_switch_id_keys")]
    pub switch_id_to_switch_info: BTreeMap<SwitchId, SwitchInfo>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Flattened structs buffer their input, and buffered map keys are always
// strings, so integer-keyed maps are parsed by hand.
fn deserialize_switch_id_keys<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<SwitchId, SwitchInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, SwitchInfo>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, info)| {
            key.parse::<i64>()
                .map(|id| (SwitchId::new(id), info))
                .map_err(|_| D::Error::custom(format!("invalid switch id {}", key)))
        })
        .collect()
}

/// Switch section of the agent config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    #[serde(default)]
    pub ports: Vec<PortConfig>,

    #[serde(default)]
    pub switch_settings: SwitchSettings,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SwitchConfig {
    /// Config with one enabled port per id and all of them in `mode`.
    pub fn with_ports(ports: &[PortId], mode: PortLoopbackMode) -> Self {
        Self {
            ports: ports
                .iter()
                .map(|id| PortConfig::new(*id).enabled().with_loopback_mode(mode))
                .collect(),
            ..Self::default()
        }
    }

    pub fn port(&self, id: PortId) -> Option<&PortConfig> {
        self.ports.iter().find(|p| p.logical_id == id)
    }
}

/// Platform section of the agent config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default)]
    pub platform_settings: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub sw: SwitchConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    /// Command line defaults baked into the config file.
    #[serde(default)]
    pub default_command_line_args: BTreeMap<String, String>,
}

impl AgentConfig {
    pub fn from_json(content: &str) -> EnsembleResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> EnsembleResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EnsembleError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| {
            EnsembleError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn to_json_pretty(&self) -> EnsembleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn switch_infos(&self) -> &BTreeMap<SwitchId, SwitchInfo> {
        &self.sw.switch_settings.switch_id_to_switch_info
    }
}

/// Where configs are persisted for the runtime to read at start.
pub trait ConfigSink: Send + Sync {
    fn write_config(&self, config: &AgentConfig) -> EnsembleResult<()>;
}

/// Writes the config as pretty JSON to a file.
///
/// The file is replaced atomically so the runtime never reads a
/// partially written config.
#[derive(Debug, Clone)]
pub struct FileConfigSink {
    path: PathBuf,
}

impl FileConfigSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigSink {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigSink for FileConfigSink {
    fn write_config(&self, config: &AgentConfig) -> EnsembleResult<()> {
        let content = config.to_json_pretty()?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), "agent config written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use swagent_types::SwitchType;

    const SAMPLE: &str = r#"{
        "sw": {
            "ports": [
                {"logicalID": 1, "name": "eth1/1/1", "enabled": true, "speed": 100000},
                {"logicalID": 2, "loopbackMode": "MAC"}
            ],
            "switchSettings": {
                "switchIdToSwitchInfo": {
                    "0": {"switchIndex": 0, "switchType": "npu"},
                    "4": {"switchIndex": 1, "switchType": "fabric"}
                },
                "l2LearningMode": 1
            },
            "vlans": [{"id": 1}]
        },
        "platform": {
            "platformSettings": {"chip": "tomahawk"},
            "chip": {"asic": "th4"}
        },
        "defaultCommandLineArgs": {"hw_agent_base_port": "5931"}
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = AgentConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.sw.ports.len(), 2);
        assert_eq!(config.sw.ports[0].name.as_deref(), Some("eth1/1/1"));
        assert!(config.sw.ports[0].enabled);
        assert_eq!(config.sw.ports[0].extra["speed"], json!(100000));
        assert_eq!(config.sw.ports[1].loopback_mode, PortLoopbackMode::Mac);

        let infos = config.switch_infos();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[&SwitchId::new(4)].switch_type, SwitchType::Fabric);
        assert_eq!(config.sw.switch_settings.extra["l2LearningMode"], json!(1));
        assert_eq!(config.sw.extra["vlans"], json!([{"id": 1}]));
        assert_eq!(config.platform.platform_settings["chip"], "tomahawk");
        assert_eq!(config.default_command_line_args["hw_agent_base_port"], "5931");
    }

    #[test]
    fn test_unknown_keys_survive_rewrite() {
        let config = AgentConfig::from_json(SAMPLE).unwrap();
        let rewritten = AgentConfig::from_json(&config.to_json_pretty().unwrap()).unwrap();
        assert_eq!(rewritten, config);
    }

    #[test]
    fn test_file_sink_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileConfigSink::new(dir.path().join(DEFAULT_CONFIG_FILE));
        let mut config = AgentConfig::default();
        config.sw = SwitchConfig::with_ports(&[PortId::new(1), PortId::new(2)], PortLoopbackMode::Mac);

        sink.write_config(&config).unwrap();
        let read_back = AgentConfig::from_file(sink.path()).unwrap();
        assert_eq!(read_back, config);
        assert!(!dir.path().join("agent.conf.tmp").exists());
    }

    #[test]
    fn test_file_sink_unwritable() {
        let sink = FileConfigSink::new("/nonexistent/dir/agent.conf");
        let err = sink.write_config(&AgentConfig::default()).unwrap_err();
        assert!(matches!(err, EnsembleError::Io(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AgentConfig::from_file("/nonexistent/agent.conf").unwrap_err();
        assert!(matches!(err, EnsembleError::Config(_)));
    }

    #[test]
    fn test_non_integer_switch_id_rejected() {
        let err = AgentConfig::from_json(
            r#"{"sw": {"switchSettings": {"switchIdToSwitchInfo": {"npu0": {"switchIndex": 0}}}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid switch id npu0"));
    }

    #[test]
    fn test_default_sink_path() {
        assert_eq!(FileConfigSink::default().path(), Path::new("agent.conf"));
    }
}
