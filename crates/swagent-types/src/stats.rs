//! Hardware port counters.

use serde::{Deserialize, Serialize};

/// Snapshot of the counters of one port, as of the last completed poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HwPortStats {
    pub in_bytes: u64,
    pub in_unicast_pkts: u64,
    pub in_discards: u64,
    pub in_errors: u64,
    pub out_bytes: u64,
    pub out_unicast_pkts: u64,
    pub out_discards: u64,
    pub out_errors: u64,
    pub fec_correctable_errors: u64,
    pub fec_uncorrectable_errors: u64,
    /// Seconds since the epoch at which the poll completed.
    pub timestamp_secs: i64,
}

impl HwPortStats {
    /// Total packets dropped in either direction.
    pub fn total_discards(&self) -> u64 {
        self.in_discards.saturating_add(self.out_discards)
    }
}
