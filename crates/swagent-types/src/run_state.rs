//! Agent lifecycle phase.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle phase of the switch agent.
///
/// The variants are declared in progression order so the derived `Ord`
/// is the lifecycle order. Only the position relative to `Configured`
/// gates behavior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchRunState {
    #[default]
    Uninitialized,
    Initialized,
    Configured,
    FibSynced,
    Exiting,
}

impl SwitchRunState {
    /// Returns true once the initial configuration has been applied.
    pub fn is_configured(&self) -> bool {
        *self >= SwitchRunState::Configured
    }

    /// Returns true for the terminal state.
    pub fn is_exiting(&self) -> bool {
        *self == SwitchRunState::Exiting
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SwitchRunState::Uninitialized => "UNINITIALIZED",
            SwitchRunState::Initialized => "INITIALIZED",
            SwitchRunState::Configured => "CONFIGURED",
            SwitchRunState::FibSynced => "FIB_SYNCED",
            SwitchRunState::Exiting => "EXITING",
        }
    }
}

impl fmt::Display for SwitchRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchRunState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNINITIALIZED" => Ok(SwitchRunState::Uninitialized),
            "INITIALIZED" => Ok(SwitchRunState::Initialized),
            "CONFIGURED" => Ok(SwitchRunState::Configured),
            "FIB_SYNCED" => Ok(SwitchRunState::FibSynced),
            "EXITING" => Ok(SwitchRunState::Exiting),
            _ => Err(ParseError::InvalidRunState(s.to_string())),
        }
    }
}
