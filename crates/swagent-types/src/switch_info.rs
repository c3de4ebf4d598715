//! Per-switch descriptors supplied by configuration.

use crate::{ParseError, PortId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of ASIC a switch id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    /// Regular forwarding ASIC.
    #[default]
    Npu,
    /// Fabric element connecting VOQ switches.
    Fabric,
    /// Virtual output queue switch in a distributed chassis.
    Voq,
    /// External PHY.
    Phy,
}

impl SwitchType {
    /// Returns true if routes are programmed on this switch type.
    pub const fn programs_routes(&self) -> bool {
        matches!(self, SwitchType::Npu | SwitchType::Voq)
    }
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchType::Npu => "npu",
            SwitchType::Fabric => "fabric",
            SwitchType::Voq => "voq",
            SwitchType::Phy => "phy",
        };
        f.write_str(s)
    }
}

impl FromStr for SwitchType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npu" => Ok(SwitchType::Npu),
            "fabric" => Ok(SwitchType::Fabric),
            "voq" => Ok(SwitchType::Voq),
            "phy" => Ok(SwitchType::Phy),
            _ => Err(ParseError::InvalidSwitchType(s.to_string())),
        }
    }
}

/// Inclusive range of logical port ids owned by one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortIdRange {
    pub minimum: u32,
    pub maximum: u32,
}

impl PortIdRange {
    pub const fn new(minimum: u32, maximum: u32) -> Self {
        Self { minimum, maximum }
    }

    /// Returns true if `port` falls inside the range.
    pub const fn contains(&self, port: PortId) -> bool {
        port.as_raw() >= self.minimum && port.as_raw() <= self.maximum
    }
}

/// Descriptor of one managed switch.
///
/// `switch_index` is the ordinal of the switch on this box; the hw agent
/// serving the switch listens on `base_port + switch_index`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchInfo {
    pub switch_index: u16,

    #[serde(default)]
    pub switch_type: SwitchType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_id_range: Option<PortIdRange>,
}

impl SwitchInfo {
    /// Creates an NPU switch descriptor with the given index.
    pub fn new(switch_index: u16) -> Self {
        Self {
            switch_index,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, switch_type: SwitchType) -> Self {
        self.switch_type = switch_type;
        self
    }

    pub fn with_port_id_range(mut self, range: PortIdRange) -> Self {
        self.port_id_range = Some(range);
        self
    }
}
