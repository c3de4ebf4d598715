//! Mapping from logical entities to the managed switches they live on.

use crate::{PortId, SwitchId, SwitchInfo};
use std::collections::{BTreeMap, BTreeSet};

/// Resolves which managed switches an entity applies to.
pub trait ScopeResolver: Send + Sync {
    /// All managed switches.
    fn all_switch_ids(&self) -> BTreeSet<SwitchId>;

    /// Switches owning the given port. Empty if no switch owns it.
    fn scope_for_port(&self, port: PortId) -> BTreeSet<SwitchId>;

    /// Switches that routes are programmed on.
    fn scope_for_routes(&self) -> BTreeSet<SwitchId>;
}

/// Scope resolver built from the configured switch id to info map.
///
/// A single-switch box may not carry port ranges in its config; in that
/// case every port belongs to the only switch.
#[derive(Debug, Clone, Default)]
pub struct SwitchIdScopeResolver {
    switches: BTreeMap<SwitchId, SwitchInfo>,
}

impl SwitchIdScopeResolver {
    pub fn new(switches: BTreeMap<SwitchId, SwitchInfo>) -> Self {
        Self { switches }
    }

    pub fn switch_info(&self, switch_id: SwitchId) -> Option<&SwitchInfo> {
        self.switches.get(&switch_id)
    }

    pub fn has_multiple_switches(&self) -> bool {
        self.switches.len() > 1
    }
}

impl ScopeResolver for SwitchIdScopeResolver {
    fn all_switch_ids(&self) -> BTreeSet<SwitchId> {
        self.switches.keys().copied().collect()
    }

    fn scope_for_port(&self, port: PortId) -> BTreeSet<SwitchId> {
        if self.switches.len() == 1 {
            return self.all_switch_ids();
        }
        self.switches
            .iter()
            .filter(|(_, info)| info.port_id_range.is_some_and(|range| range.contains(port)))
            .map(|(id, _)| *id)
            .collect()
    }

    fn scope_for_routes(&self) -> BTreeSet<SwitchId> {
        self.switches
            .iter()
            .filter(|(_, info)| info.switch_type.programs_routes())
            .map(|(id, _)| *id)
            .collect()
    }
}
