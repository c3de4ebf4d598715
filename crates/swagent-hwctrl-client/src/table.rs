//! Table of hw-ctrl clients keyed by switch id.

use crate::client::HwCtrlClient;
use crate::error::{HwCtrlError, HwCtrlResult};
use crate::evb::EventBaseThread;
use crate::factory::{ChannelFactory, ClientOptions};
use std::collections::BTreeMap;
use std::sync::Arc;
use swagent_types::{Reachability, SwitchId, SwitchInfo};
use tracing::{error, info, instrument};

/// Name of the thread carrying all client I/O of a table.
pub const EVB_THREAD_NAME: &str = "HwSwitchCtrlClient";

/// One client per managed switch, created up front and kept for the
/// lifetime of the table.
///
/// The hw agent of a switch listens on `base_port + switch_index`.
/// Building the table never connects; each client connects on its
/// first call.
pub struct HwSwitchClientTable {
    clients: BTreeMap<SwitchId, HwCtrlClient>,
    evb: Arc<EventBaseThread>,
}

impl HwSwitchClientTable {
    pub fn new(
        base_port: u16,
        switch_id_to_switch_info: &BTreeMap<SwitchId, SwitchInfo>,
    ) -> HwCtrlResult<Self> {
        Self::with_options(base_port, switch_id_to_switch_info, ClientOptions::default())
    }

    #[instrument(skip(switch_id_to_switch_info, options), fields(switches = switch_id_to_switch_info.len()))]
    pub fn with_options(
        base_port: u16,
        switch_id_to_switch_info: &BTreeMap<SwitchId, SwitchInfo>,
        options: ClientOptions,
    ) -> HwCtrlResult<Self> {
        let evb = Arc::new(EventBaseThread::new(EVB_THREAD_NAME)?);
        let factory = ChannelFactory::new(Arc::clone(&evb), options);

        let mut clients = BTreeMap::new();
        for (&switch_id, info) in switch_id_to_switch_info {
            let port = base_port.checked_add(info.switch_index).ok_or(
                HwCtrlError::PortOutOfRange {
                    switch_id,
                    base_port,
                    switch_index: info.switch_index,
                },
            )?;
            let channel = factory.create_channel(port);
            clients.insert(switch_id, HwCtrlClient::new(switch_id, port, channel));
        }

        info!(clients = clients.len(), base_port, "hw switch client table created");
        Ok(Self { clients, evb })
    }

    /// Returns the client of a managed switch.
    pub fn get_client(&self, switch_id: SwitchId) -> HwCtrlResult<&HwCtrlClient> {
        self.clients
            .get(&switch_id)
            .ok_or(HwCtrlError::NoClient { switch_id })
    }

    /// Queries the fabric reachability of one switch.
    ///
    /// Returns `Ok(None)` when the hw agent could not be queried; the
    /// failure is logged. An empty map means the switch sees no
    /// neighbors. Fails only if the switch is not managed.
    pub fn get_fabric_reachability(&self, switch_id: SwitchId) -> HwCtrlResult<Option<Reachability>> {
        let client = self.get_client(switch_id)?;
        match client.sync_get_hw_fabric_reachability() {
            Ok(reachability) => Ok(Some(reachability)),
            Err(e) => {
                error!(
                    switch_id = %switch_id,
                    port = client.port(),
                    error = %e,
                    "Failed to get fabric reachability for switch"
                );
                Ok(None)
            }
        }
    }

    pub fn switch_ids(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.clients.keys().copied()
    }

    /// Port the client of `switch_id` connects to.
    pub fn port_for(&self, switch_id: SwitchId) -> Option<u16> {
        self.clients.get(&switch_id).map(HwCtrlClient::port)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn event_base(&self) -> &Arc<EventBaseThread> {
        &self.evb
    }
}

impl std::fmt::Debug for HwSwitchClientTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwSwitchClientTable")
            .field("clients", &self.clients)
            .finish()
    }
}
