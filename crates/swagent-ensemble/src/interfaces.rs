//! Collaborators the ensemble drives.
//!
//! The platform, the switch runtime and the link state toggler are
//! implemented elsewhere; the ensemble only sees these traits. All of
//! them are shared across threads, so every trait is `Send + Sync`.

use crate::config::{AgentConfig, PortLoopbackMode, SwitchConfig};
use crate::error::EnsembleResult;
use crate::features::FeaturesDesired;
use crate::routes::{RouteChunk, RouteOp};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use swagent_types::{ClientId, HwPortStats, L2Entry, L2EntryUpdateType, PortId, RouterId};

/// Role of a port in the platform mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformPortType {
    /// Front panel port.
    Interface,
    /// Port towards a fabric element.
    Fabric,
    Recycle,
    Management,
}

/// One port of the platform mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPort {
    pub id: PortId,
    pub name: String,
    pub port_type: PlatformPortType,
}

impl PlatformPort {
    pub fn new(id: PortId, name: impl Into<String>, port_type: PlatformPortType) -> Self {
        Self {
            id,
            name: name.into(),
            port_type,
        }
    }

    pub fn interface(id: PortId, name: impl Into<String>) -> Self {
        Self::new(id, name, PlatformPortType::Interface)
    }
}

/// Hardware platform: ASIC plus port mapping.
pub trait Platform: Send + Sync {
    fn platform_ports(&self) -> Vec<PlatformPort>;

    /// Features the platform was created with.
    fn features(&self) -> FeaturesDesired;
}

pub trait PlatformFactory: Send + Sync {
    fn create_platform(
        &self,
        config: &AgentConfig,
        features: FeaturesDesired,
    ) -> EnsembleResult<Arc<dyn Platform>>;
}

/// A packet punted to software.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxPacket {
    pub src_port: PortId,
    pub src_vlan: Option<u16>,
    pub data: Vec<u8>,
}

/// Fault reported by the PHY along with a link event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkFaultStatus {
    pub local_fault: bool,
    pub remote_fault: bool,
}

/// The switch runtime.
pub trait SwSwitch: Send + Sync {
    /// Runs the agent. Blocks until the agent exits; returns early with
    /// an error if it cannot start.
    fn run(&self) -> EnsembleResult<()>;

    /// Waits up to `timeout` for initialization to complete. Returns
    /// true once the agent is ready.
    fn wait_for_init_done(&self, timeout: Duration) -> bool;

    /// Applies `config` to the running agent.
    fn apply_config(&self, reason: &str, config: &SwitchConfig) -> EnsembleResult<()>;

    fn packet_received(&self, packet: RxPacket);

    fn l2_learning_update_received(&self, entry: L2Entry, update: L2EntryUpdateType);

    fn pfc_watchdog_state_changed(&self, port: PortId, deadlock: bool);

    fn exit_fatal(&self);

    /// Applies one route chunk as a single update.
    fn update_routes(
        &self,
        router: RouterId,
        client: ClientId,
        chunk: &RouteChunk,
        op: RouteOp,
    ) -> EnsembleResult<()>;

    /// Port counters from the last completed poll. Never polls.
    fn latest_port_stats(&self) -> BTreeMap<PortId, HwPortStats>;

    /// Polls the hardware counters.
    fn update_stats(&self);

    /// Stops the agent after the in-flight update is flushed.
    fn graceful_exit(&self) -> EnsembleResult<()>;
}

pub trait SwSwitchFactory: Send + Sync {
    fn create_switch(&self, platform: Arc<dyn Platform>) -> EnsembleResult<Arc<dyn SwSwitch>>;
}

/// Scripts link up/down transitions on ports.
pub trait LinkStateToggler: Send + Sync {
    /// A link event observed by the hardware.
    fn link_state_changed(&self, port: PortId, up: bool);

    fn bring_up_ports(&self, ports: &[PortId]) -> EnsembleResult<()>;

    fn bring_down_ports(&self, ports: &[PortId]) -> EnsembleResult<()>;
}

pub trait LinkStateTogglerFactory: Send + Sync {
    fn create_toggler(
        &self,
        sw: Arc<dyn SwSwitch>,
        mode: PortLoopbackMode,
    ) -> EnsembleResult<Arc<dyn LinkStateToggler>>;
}

/// Events raised by the hardware layer.
pub trait HwSwitchCallback: Send + Sync {
    fn packet_received(&self, packet: RxPacket);

    fn link_state_changed(&self, port: PortId, up: bool, fault: Option<LinkFaultStatus>);

    fn l2_learning_update_received(&self, entry: L2Entry, update: L2EntryUpdateType);

    fn pfc_watchdog_state_changed(&self, port: PortId, deadlock: bool);

    fn exit_fatal(&self);
}
