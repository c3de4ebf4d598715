//! Fabric reachability types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reachability as reported by one hw agent: neighbor id to endpoint.
pub type Reachability = BTreeMap<i64, FabricEndpoint>;

fn default_attached() -> bool {
    true
}

/// One neighbor seen on a fabric link.
///
/// `switch_id` and `port` identify the remote end. The expected ids, when
/// present, come from the cabling plan and are used to detect miscabling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricEndpoint {
    pub switch_id: i64,
    pub port: i32,

    #[serde(default = "default_attached")]
    pub is_attached: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_switch_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_port_id: Option<i32>,
}

impl FabricEndpoint {
    /// Creates an attached endpoint with no cabling expectation.
    pub fn new(switch_id: i64, port: i32) -> Self {
        Self {
            switch_id,
            port,
            is_attached: true,
            switch_name: None,
            port_name: None,
            expected_switch_id: None,
            expected_port_id: None,
        }
    }

    pub fn with_expected(mut self, switch_id: i64, port: i32) -> Self {
        self.expected_switch_id = Some(switch_id);
        self.expected_port_id = Some(port);
        self
    }

    pub fn detached(mut self) -> Self {
        self.is_attached = false;
        self
    }

    /// Returns true if the link is up but lands somewhere other than planned.
    pub fn is_mismatched(&self) -> bool {
        if !self.is_attached {
            return false;
        }
        let switch_mismatch = self
            .expected_switch_id
            .is_some_and(|expected| expected != self.switch_id);
        let port_mismatch = self
            .expected_port_id
            .is_some_and(|expected| expected != self.port);
        switch_mismatch || port_mismatch
    }
}

/// Health counters for fabric reachability collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FabricReachabilityStats {
    /// Endpoints reported but not attached.
    pub missing_count: u64,
    /// Attached endpoints whose neighbor differs from the expected one.
    pub mismatch_count: u64,
    /// Reachability queries that failed after retries.
    pub query_failures: u64,
    /// Switches whose reachability is currently indeterminate.
    pub switches_unknown: u64,
}
