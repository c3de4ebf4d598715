//! RPC handle for one hw agent.

use crate::channel::PooledChannel;
use crate::error::HwCtrlResult;
use crate::wire::{RpcRequest, GET_HW_FABRIC_REACHABILITY};
use serde::de::DeserializeOwned;
use serde::Serialize;
use swagent_types::{Reachability, SwitchId};
use tracing::debug;

/// Client bound to the hw agent of a single switch.
///
/// Calls are synchronous for the caller. Connection, retry and reconnect
/// state is private to this client.
pub struct HwCtrlClient {
    switch_id: SwitchId,
    port: u16,
    channel: PooledChannel,
}

impl HwCtrlClient {
    pub fn new(switch_id: SwitchId, port: u16, channel: PooledChannel) -> Self {
        Self {
            switch_id,
            port,
            channel,
        }
    }

    pub fn switch_id(&self) -> SwitchId {
        self.switch_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns true once the first call has built the connection stack.
    pub fn is_initialized(&self) -> bool {
        self.channel.is_initialized()
    }

    /// Invokes `method` with `params` and decodes the result.
    pub fn call<P, R>(&self, method: &str, params: &P) -> HwCtrlResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest::new(method, serde_json::to_value(params)?);
        debug!(switch_id = %self.switch_id, method, "hw agent call");
        let value = self.channel.sync_request(request)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Queries the neighbors the hw agent sees on its fabric ports.
    pub fn sync_get_hw_fabric_reachability(&self) -> HwCtrlResult<Reachability> {
        self.call(GET_HW_FABRIC_REACHABILITY, &())
    }
}

impl std::fmt::Debug for HwCtrlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwCtrlClient")
            .field("switch_id", &self.switch_id)
            .field("port", &self.port)
            .finish()
    }
}
