//! Fabric reachability collected from every managed switch.

use std::collections::{BTreeMap, BTreeSet};
use swagent_types::{FabricEndpoint, FabricReachabilityStats, PortId, Reachability, SwitchId};
use tracing::warn;

/// Last known reachability of each switch plus collection health.
///
/// A failed query leaves the switch's previous snapshot in place and
/// marks it unknown until the next successful query.
#[derive(Debug, Clone, Default)]
pub struct ReachabilitySnapshot {
    per_switch: BTreeMap<SwitchId, Reachability>,
    unknown: BTreeSet<SwitchId>,
    query_failures: u64,
}

impl ReachabilitySnapshot {
    /// Records the outcome of one query; `None` means the query failed.
    pub fn record(&mut self, switch_id: SwitchId, result: Option<Reachability>) {
        match result {
            Some(reachability) => {
                self.per_switch.insert(switch_id, reachability);
                self.unknown.remove(&switch_id);
            }
            None => {
                self.query_failures += 1;
                self.unknown.insert(switch_id);
            }
        }
    }

    pub fn switch_reachability(&self, switch_id: SwitchId) -> Option<&Reachability> {
        self.per_switch.get(&switch_id)
    }

    pub fn is_unknown(&self, switch_id: SwitchId) -> bool {
        self.unknown.contains(&switch_id)
    }

    /// Local port to remote endpoint, across all switches.
    pub fn aggregate(&self) -> BTreeMap<PortId, FabricEndpoint> {
        let mut ports = BTreeMap::new();
        for (switch_id, reachability) in &self.per_switch {
            for (local_port, endpoint) in reachability {
                match u32::try_from(*local_port) {
                    Ok(port) => {
                        ports.insert(PortId::new(port), endpoint.clone());
                    }
                    Err(_) => warn!(
                        switch_id = %switch_id,
                        port = local_port,
                        "ignoring reachability entry with invalid port id"
                    ),
                }
            }
        }
        ports
    }

    pub fn stats(&self) -> FabricReachabilityStats {
        let endpoints = || self.per_switch.values().flat_map(|r| r.values());
        FabricReachabilityStats {
            missing_count: endpoints().filter(|e| !e.is_attached).count() as u64,
            mismatch_count: endpoints().filter(|e| e.is_mismatched()).count() as u64,
            query_failures: self.query_failures,
            switches_unknown: self.unknown.len() as u64,
        }
    }
}
