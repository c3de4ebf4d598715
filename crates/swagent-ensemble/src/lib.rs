//! Lifecycle orchestrator for a switch agent under test.
//!
//! [`AgentEnsemble`] brings up a platform and switch runtime, stages the
//! initial config, runs the agent on a background thread and then
//! mediates everything a test does with it: config changes, run state
//! observation, hardware event forwarding, route programming, port
//! stats and fabric reachability collected through the hw-ctrl client
//! table.
//!
//! The platform, switch runtime and link state toggler are supplied as
//! trait objects (see [`interfaces`]).

pub mod config;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod interfaces;
pub mod observer;
pub mod reachability;
pub mod routes;

pub use config::{
    AgentConfig, ConfigSink, FileConfigSink, PlatformConfig, PortConfig, PortLoopbackMode,
    SwitchConfig, SwitchSettings, DEFAULT_CONFIG_FILE,
};
pub use ensemble::{
    AgentEnsemble, EnsembleCollaborators, EnsembleOptions, PlatformConfigFn, SwitchConfigFn,
    DEFAULT_HW_AGENT_BASE_PORT, INIT_THREAD_NAME,
};
pub use error::{EnsembleError, EnsembleResult};
pub use features::FeaturesDesired;
pub use interfaces::{
    HwSwitchCallback, LinkFaultStatus, LinkStateToggler, LinkStateTogglerFactory, Platform,
    PlatformFactory, PlatformPort, PlatformPortType, RxPacket, SwSwitch, SwSwitchFactory,
};
pub use observer::{StateObserver, StateObserverRegistry};
pub use reachability::ReachabilitySnapshot;
pub use routes::{
    chunk_routes, RouteChunk, RouteDistributionGenerator, RouteOp, StaticRouteGenerator,
    UnicastRoute,
};
