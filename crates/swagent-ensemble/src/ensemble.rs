//! The agent ensemble: bring-up and operation of one switch agent.

use crate::config::{AgentConfig, ConfigSink, PlatformConfig, PortLoopbackMode, SwitchConfig};
use crate::error::{EnsembleError, EnsembleResult};
use crate::features::FeaturesDesired;
use crate::interfaces::{
    HwSwitchCallback, LinkFaultStatus, LinkStateToggler, LinkStateTogglerFactory, Platform,
    PlatformFactory, PlatformPortType, RxPacket, SwSwitch, SwSwitchFactory,
};
use crate::observer::{StateObserver, StateObserverRegistry};
use crate::reachability::ReachabilitySnapshot;
use crate::routes::{RouteChunk, RouteDistributionGenerator, RouteOp};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use swagent_hwctrl_client::{ClientOptions, HwSwitchClientTable};
use swagent_types::{
    ClientId, FabricEndpoint, FabricReachabilityStats, HwPortStats, L2Entry, L2EntryUpdateType,
    PortId, RouterId, SwitchIdScopeResolver, SwitchRunState,
};
use tracing::{debug, error, info, instrument, warn};

/// Name of the thread running the switch runtime.
pub const INIT_THREAD_NAME: &str = "AgentInit";

/// Default port of the hw agent with switch index 0.
pub const DEFAULT_HW_AGENT_BASE_PORT: u16 = 5931;

const INIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Computes the initial switch config from the runtime and the master
/// logical ports.
pub type SwitchConfigFn<'a> = &'a dyn Fn(&dyn SwSwitch, &[PortId]) -> EnsembleResult<SwitchConfig>;

/// Adjusts the platform config before the platform is created.
pub type PlatformConfigFn<'a> = &'a dyn Fn(&mut PlatformConfig);

/// Factories and sinks the ensemble builds on.
#[derive(Clone)]
pub struct EnsembleCollaborators {
    pub platform_factory: Arc<dyn PlatformFactory>,
    pub switch_factory: Arc<dyn SwSwitchFactory>,
    pub config_sink: Arc<dyn ConfigSink>,
    pub toggler_factory: Option<Arc<dyn LinkStateTogglerFactory>>,
}

#[derive(Debug, Clone)]
pub struct EnsembleOptions {
    /// Config the initial agent config is derived from.
    pub input_config: AgentConfig,
    pub hw_agent_base_port: u16,
    pub client_options: ClientOptions,
}

impl EnsembleOptions {
    pub fn new(input_config: AgentConfig) -> Self {
        Self {
            input_config,
            hw_agent_base_port: DEFAULT_HW_AGENT_BASE_PORT,
            client_options: ClientOptions::default(),
        }
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> EnsembleResult<Self> {
        Ok(Self::new(AgentConfig::from_file(path)?))
    }

    pub fn with_hw_agent_base_port(mut self, port: u16) -> Self {
        self.hw_agent_base_port = port;
        self
    }

    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = options;
        self
    }
}

/// Everything created by `setup_ensemble`.
struct EnsembleState {
    platform: Arc<dyn Platform>,
    sw: Arc<dyn SwSwitch>,
    master_logical_port_ids: Vec<PortId>,
    agent_config: RwLock<AgentConfig>,
    scope_resolver: SwitchIdScopeResolver,
    client_table: Option<HwSwitchClientTable>,
}

/// Drives bring-up, configuration, run state, event forwarding, route
/// programming, stats and fabric reachability for one switch agent.
///
/// All operations take `&self`; the ensemble is meant to be shared
/// through an `Arc` between the test driver and the hardware callbacks.
///
/// Run state transitions are serialized and observers are notified
/// while the transition is held, so an observer must not itself call
/// [`AgentEnsemble::switch_run_state_changed`].
pub struct AgentEnsemble {
    collaborators: EnsembleCollaborators,
    options: EnsembleOptions,
    state: OnceCell<EnsembleState>,
    run_state: RwLock<SwitchRunState>,
    transition: Mutex<()>,
    observers: Mutex<StateObserverRegistry>,
    link_toggler: RwLock<Option<Arc<dyn LinkStateToggler>>>,
    loopback_mode: RwLock<PortLoopbackMode>,
    reachability: RwLock<ReachabilitySnapshot>,
    refresh: Mutex<()>,
    init_thread: Mutex<Option<JoinHandle<()>>>,
}

impl AgentEnsemble {
    pub fn new(collaborators: EnsembleCollaborators, options: EnsembleOptions) -> Self {
        Self {
            collaborators,
            options,
            state: OnceCell::new(),
            run_state: RwLock::new(SwitchRunState::Uninitialized),
            transition: Mutex::new(()),
            observers: Mutex::new(StateObserverRegistry::new()),
            link_toggler: RwLock::new(None),
            loopback_mode: RwLock::new(PortLoopbackMode::Mac),
            reachability: RwLock::new(ReachabilitySnapshot::default()),
            refresh: Mutex::new(()),
            init_thread: Mutex::new(None),
        }
    }

    /// Creates, sets up and starts an ensemble.
    pub fn create(
        collaborators: EnsembleCollaborators,
        options: EnsembleOptions,
        features: FeaturesDesired,
        config_fn: SwitchConfigFn<'_>,
        platform_config_fn: Option<PlatformConfigFn<'_>>,
    ) -> EnsembleResult<Arc<Self>> {
        let ensemble = Arc::new(Self::new(collaborators, options));
        ensemble.setup_ensemble(features, config_fn, platform_config_fn)?;
        ensemble.start_agent()?;
        Ok(ensemble)
    }

    fn setup_state(&self, operation: &'static str) -> EnsembleResult<&EnsembleState> {
        self.state
            .get()
            .ok_or(EnsembleError::NotSetUp { operation })
    }

    /// Creates the platform and switch runtime, computes the initial
    /// config and stages it for the runtime.
    #[instrument(skip_all, fields(features = %features))]
    pub fn setup_ensemble(
        &self,
        features: FeaturesDesired,
        config_fn: SwitchConfigFn<'_>,
        platform_config_fn: Option<PlatformConfigFn<'_>>,
    ) -> EnsembleResult<()> {
        if self.state.get().is_some() {
            return Err(EnsembleError::AlreadySetUp);
        }

        let mut agent_config = self.options.input_config.clone();
        if let Some(platform_config_fn) = platform_config_fn {
            platform_config_fn(&mut agent_config.platform);
        }

        let platform = self
            .collaborators
            .platform_factory
            .create_platform(&agent_config, features)?;
        let sw = self
            .collaborators
            .switch_factory
            .create_switch(Arc::clone(&platform))?;

        let mut master_logical_port_ids: Vec<PortId> = platform
            .platform_ports()
            .into_iter()
            .filter(|port| port.port_type == PlatformPortType::Interface)
            .map(|port| port.id)
            .collect();
        master_logical_port_ids.sort();
        master_logical_port_ids.dedup();

        agent_config.sw = config_fn(sw.as_ref(), &master_logical_port_ids)?;
        self.collaborators.config_sink.write_config(&agent_config)?;

        let switch_infos = agent_config.switch_infos().clone();
        let client_table = if switch_infos.is_empty() {
            None
        } else {
            Some(HwSwitchClientTable::with_options(
                self.options.hw_agent_base_port,
                &switch_infos,
                self.options.client_options.clone(),
            )?)
        };

        info!(
            ports = master_logical_port_ids.len(),
            switches = switch_infos.len(),
            "ensemble set up"
        );
        let state = EnsembleState {
            platform,
            sw,
            master_logical_port_ids,
            agent_config: RwLock::new(agent_config),
            scope_resolver: SwitchIdScopeResolver::new(switch_infos),
            client_table,
        };
        self.state
            .set(state)
            .map_err(|_| EnsembleError::AlreadySetUp)
    }

    /// Runs the switch runtime on its own thread and waits until it is
    /// ready or fails to start.
    #[instrument(skip(self))]
    pub fn start_agent(&self) -> EnsembleResult<()> {
        let state = self.setup_state("start_agent")?;
        let mut init_thread = self.init_thread.lock();
        if init_thread.is_some() {
            return Err(EnsembleError::AlreadyStarted);
        }

        let (exit_tx, exit_rx) = mpsc::channel();
        let sw = Arc::clone(&state.sw);
        let handle = thread::Builder::new()
            .name(INIT_THREAD_NAME.to_string())
            .spawn(move || {
                let result = sw.run();
                match &result {
                    Ok(()) => debug!("switch runtime exited"),
                    Err(e) => error!(error = %e, "switch runtime failed"),
                }
                let _ = exit_tx.send(result);
            })?;
        *init_thread = Some(handle);
        drop(init_thread);

        let failure = loop {
            if state.sw.wait_for_init_done(INIT_POLL_INTERVAL) {
                info!("agent started");
                return Ok(());
            }
            match exit_rx.try_recv() {
                Ok(Err(e)) => break e,
                Ok(Ok(())) | Err(TryRecvError::Disconnected) => {
                    break EnsembleError::switch(
                        "start",
                        "runtime exited before initialization completed",
                    )
                }
                Err(TryRecvError::Empty) => {}
            }
        };

        // The runtime has returned; reap its thread so start can be retried.
        self.join_init_thread();
        Err(failure)
    }

    fn join_init_thread(&self) {
        let handle = self.init_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("agent init thread panicked");
            }
        }
    }

    /// Persists `config`; with `activate` the running agent also applies
    /// it, otherwise it takes effect at the next start.
    #[instrument(skip(self, config))]
    pub fn apply_new_config(&self, config: SwitchConfig, activate: bool) -> EnsembleResult<()> {
        let state = self.setup_state("apply_new_config")?;
        {
            let mut agent_config = state.agent_config.write();
            let mut next = agent_config.clone();
            next.sw = config.clone();
            self.collaborators.config_sink.write_config(&next)?;
            *agent_config = next;
        }
        if activate {
            state.sw.apply_config("applying new config", &config)?;
        }
        Ok(())
    }

    /// Stages the config the agent starts with.
    pub fn apply_initial_config(&self, config: SwitchConfig) -> EnsembleResult<()> {
        self.apply_new_config(config, false)
    }

    /// Attaches a link state toggler using the current loopback mode.
    #[instrument(skip(self))]
    pub fn setup_link_state_toggler(&self) -> EnsembleResult<()> {
        let state = self.setup_state("setup_link_state_toggler")?;
        let factory = self
            .collaborators
            .toggler_factory
            .as_ref()
            .ok_or_else(|| EnsembleError::config("no link state toggler factory"))?;
        let mode = self.loopback_mode();
        let toggler = factory.create_toggler(Arc::clone(&state.sw), mode)?;
        *self.link_toggler.write() = Some(toggler);
        info!(mode = ?mode, "link state toggler attached");
        Ok(())
    }

    pub fn set_loopback_mode(&self, mode: PortLoopbackMode) {
        *self.loopback_mode.write() = mode;
    }

    pub fn loopback_mode(&self) -> PortLoopbackMode {
        *self.loopback_mode.read()
    }

    /// Records a run state transition and notifies observers.
    ///
    /// Repeating the current state is a no-op. Moving backwards is a
    /// defect: it is logged, rejected and the state is left unchanged.
    pub fn switch_run_state_changed(&self, new_state: SwitchRunState) -> EnsembleResult<()> {
        let _transition = self.transition.lock();
        let current = *self.run_state.read();
        if new_state == current {
            return Ok(());
        }
        if new_state < current {
            error!(
                current = %current,
                requested = %new_state,
                "switch run state regression"
            );
            return Err(EnsembleError::RunStateRegression {
                current,
                requested: new_state,
            });
        }

        *self.run_state.write() = new_state;
        info!(from = %current, to = %new_state, "switch run state changed");

        let observers = self.observers.lock().live();
        for (name, observer) in observers {
            debug!(observer = %name, state = %new_state, "notifying state observer");
            observer.run_state_changed(new_state);
        }
        Ok(())
    }

    pub fn run_state(&self) -> SwitchRunState {
        *self.run_state.read()
    }

    pub fn register_state_observer(
        &self,
        observer: &Arc<dyn StateObserver>,
        name: &str,
    ) -> EnsembleResult<()> {
        self.observers.lock().register(observer, name)
    }

    /// Unregisters `observer`; unknown observers are ignored.
    pub fn unregister_state_observer(&self, observer: &Arc<dyn StateObserver>) {
        if !self.observers.lock().unregister(observer) {
            debug!("unregistering unknown state observer");
        }
    }

    pub fn state_observer_names(&self) -> Vec<String> {
        self.observers.lock().names()
    }

    pub fn program_routes(
        &self,
        router: RouterId,
        client: ClientId,
        chunks: &[RouteChunk],
    ) -> EnsembleResult<()> {
        self.apply_route_chunks(router, client, chunks, RouteOp::Add)
    }

    pub fn unprogram_routes(
        &self,
        router: RouterId,
        client: ClientId,
        chunks: &[RouteChunk],
    ) -> EnsembleResult<()> {
        self.apply_route_chunks(router, client, chunks, RouteOp::Delete)
    }

    /// Programs the chunks produced by `generator` and returns them so
    /// the caller can unprogram them later.
    pub fn program_generated_routes(
        &self,
        router: RouterId,
        client: ClientId,
        generator: &dyn RouteDistributionGenerator,
    ) -> EnsembleResult<Vec<RouteChunk>> {
        let chunks = generator.route_chunks();
        self.program_routes(router, client, &chunks)?;
        Ok(chunks)
    }

    /// Applies chunks in order, stopping at the first failure.
    #[instrument(skip(self, chunks), fields(total_chunks = chunks.len()))]
    fn apply_route_chunks(
        &self,
        router: RouterId,
        client: ClientId,
        chunks: &[RouteChunk],
        op: RouteOp,
    ) -> EnsembleResult<()> {
        let state = self.setup_state("route update")?;
        let total_chunks = chunks.len();
        for (applied, chunk) in chunks.iter().enumerate() {
            if let Err(e) = state.sw.update_routes(router, client, chunk, op) {
                error!(
                    router = %router,
                    client = %client,
                    op = %op,
                    chunk = applied + 1,
                    total_chunks,
                    error = %e,
                    "route chunk failed"
                );
                return Err(EnsembleError::RouteUpdate {
                    router,
                    client,
                    op,
                    chunks_applied: applied,
                    total_chunks,
                    source: Box::new(e),
                });
            }
            debug!(chunk = applied + 1, routes = chunk.len(), "route chunk applied");
        }
        info!(router = %router, client = %client, op = %op, total_chunks, "routes updated");
        Ok(())
    }

    /// Counters of `ports` from the last completed poll.
    pub fn get_latest_port_stats(
        &self,
        ports: &[PortId],
    ) -> EnsembleResult<BTreeMap<PortId, HwPortStats>> {
        let state = self.setup_state("get_latest_port_stats")?;
        let mut latest = state.sw.latest_port_stats();
        ports
            .iter()
            .map(|port| {
                latest
                    .remove(port)
                    .map(|stats| (*port, stats))
                    .ok_or(EnsembleError::StatsUnavailable { port: *port })
            })
            .collect()
    }

    pub fn get_latest_port_stat(&self, port: PortId) -> EnsembleResult<HwPortStats> {
        let mut stats = self.get_latest_port_stats(&[port])?;
        stats
            .remove(&port)
            .ok_or(EnsembleError::StatsUnavailable { port })
    }

    /// Polls the hardware counters and refreshes fabric reachability.
    pub fn update_stats(&self) -> EnsembleResult<()> {
        let state = self.setup_state("update_stats")?;
        state.sw.update_stats();
        self.refresh_fabric_reachability()
    }

    /// Queries every managed switch and updates the reachability
    /// snapshot.
    pub fn refresh_fabric_reachability(&self) -> EnsembleResult<()> {
        let state = self.setup_state("refresh_fabric_reachability")?;
        let Some(table) = state.client_table.as_ref() else {
            return Ok(());
        };

        // Held across query and commit so snapshots land in query order.
        let _refresh = self.refresh.lock();
        let mut results = Vec::with_capacity(table.len());
        for switch_id in table.switch_ids() {
            results.push((switch_id, table.get_fabric_reachability(switch_id)?));
        }

        let mut snapshot = self.reachability.write();
        for (switch_id, result) in results {
            snapshot.record(switch_id, result);
        }
        Ok(())
    }

    /// Local port to remote endpoint as of the last refresh.
    pub fn get_fabric_reachability(&self) -> BTreeMap<PortId, FabricEndpoint> {
        self.reachability.read().aggregate()
    }

    pub fn get_fabric_reachability_stats(&self) -> FabricReachabilityStats {
        self.reachability.read().stats()
    }

    /// Moves to `Exiting`, stops the runtime and waits for it.
    #[instrument(skip(self))]
    pub fn graceful_exit(&self) -> EnsembleResult<()> {
        let state = self.setup_state("graceful_exit")?;
        self.switch_run_state_changed(SwitchRunState::Exiting)?;
        state.sw.graceful_exit()?;

        self.join_init_thread();
        info!("agent exited");
        Ok(())
    }

    pub fn sw(&self) -> EnsembleResult<&Arc<dyn SwSwitch>> {
        Ok(&self.setup_state("sw")?.sw)
    }

    pub fn platform(&self) -> EnsembleResult<&Arc<dyn Platform>> {
        Ok(&self.setup_state("platform")?.platform)
    }

    /// Front panel ports of the platform, sorted.
    pub fn master_logical_port_ids(&self) -> EnsembleResult<&[PortId]> {
        Ok(&self.setup_state("master_logical_port_ids")?.master_logical_port_ids)
    }

    pub fn scope_resolver(&self) -> EnsembleResult<&SwitchIdScopeResolver> {
        Ok(&self.setup_state("scope_resolver")?.scope_resolver)
    }

    /// The hw-ctrl client table; `None` when no switches are configured.
    pub fn client_table(&self) -> EnsembleResult<Option<&HwSwitchClientTable>> {
        Ok(self.setup_state("client_table")?.client_table.as_ref())
    }

    /// The agent config as last persisted.
    pub fn agent_config(&self) -> EnsembleResult<AgentConfig> {
        Ok(self.setup_state("agent_config")?.agent_config.read().clone())
    }

    pub fn link_toggler(&self) -> Option<Arc<dyn LinkStateToggler>> {
        self.link_toggler.read().clone()
    }

    fn sw_for_event(&self, event: &'static str) -> Option<&Arc<dyn SwSwitch>> {
        match self.state.get() {
            Some(state) => Some(&state.sw),
            None => {
                warn!(event, "dropping hardware event received before setup");
                None
            }
        }
    }
}

impl HwSwitchCallback for AgentEnsemble {
    fn packet_received(&self, packet: RxPacket) {
        if let Some(sw) = self.sw_for_event("packet_received") {
            sw.packet_received(packet);
        }
    }

    /// Forwarded to the toggler only once the agent is configured.
    fn link_state_changed(&self, port: PortId, up: bool, _fault: Option<LinkFaultStatus>) {
        if !self.run_state().is_configured() {
            return;
        }
        if let Some(toggler) = self.link_toggler() {
            toggler.link_state_changed(port, up);
        }
    }

    fn l2_learning_update_received(&self, entry: L2Entry, update: L2EntryUpdateType) {
        if let Some(sw) = self.sw_for_event("l2_learning_update_received") {
            sw.l2_learning_update_received(entry, update);
        }
    }

    fn pfc_watchdog_state_changed(&self, port: PortId, deadlock: bool) {
        if let Some(sw) = self.sw_for_event("pfc_watchdog_state_changed") {
            sw.pfc_watchdog_state_changed(port, deadlock);
        }
    }

    fn exit_fatal(&self) {
        if let Some(sw) = self.sw_for_event("exit_fatal") {
            sw.exit_fatal();
        }
    }
}

impl std::fmt::Debug for AgentEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentEnsemble")
            .field("run_state", &self.run_state())
            .field("set_up", &self.state.get().is_some())
            .finish()
    }
}
