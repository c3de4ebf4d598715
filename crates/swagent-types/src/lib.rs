//! Common types for the switch agent control plane.
//!
//! This crate provides the value types shared between the hw-ctrl client
//! table and the agent ensemble:
//!
//! - [`SwitchId`], [`PortId`], [`RouterId`], [`ClientId`]: typed identities
//! - [`SwitchInfo`]: per-switch descriptor supplied by configuration
//! - [`FabricEndpoint`]: one neighbor discovered on the fabric
//! - [`SwitchRunState`]: ordered lifecycle phase of the agent
//! - [`HwPortStats`]: hardware port counter snapshot
//! - [`IpPrefix`]: route destination prefix
//! - [`SwitchIdScopeResolver`]: maps ports and routes to managed switches

mod fabric;
mod ids;
mod ip;
mod l2;
mod run_state;
mod scope;
mod stats;
mod switch_info;

pub use fabric::{FabricEndpoint, FabricReachabilityStats, Reachability};
pub use ids::{ClientId, PortId, RouterId, SwitchId};
pub use ip::IpPrefix;
pub use l2::{L2Entry, L2EntryUpdateType, MacAddress};
pub use run_state::SwitchRunState;
pub use scope::{ScopeResolver, SwitchIdScopeResolver};
pub use stats::HwPortStats;
pub use switch_info::{PortIdRange, SwitchInfo, SwitchType};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid switch run state: {0}")]
    InvalidRunState(String),

    #[error("invalid switch type: {0}")]
    InvalidSwitchType(String),
}
