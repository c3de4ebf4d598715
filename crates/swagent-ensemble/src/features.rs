//! Optional hardware features requested at platform creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit set of optional hardware features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeaturesDesired(u32);

impl FeaturesDesired {
    pub const NONE: FeaturesDesired = FeaturesDesired(0);
    /// Deliver received packets to software.
    pub const PACKET_RX: FeaturesDesired = FeaturesDesired(0x01);
    /// Scan links and report state changes.
    pub const LINKSCAN: FeaturesDesired = FeaturesDesired(0x02);
    /// Deliver telemetry (TAM) event notifications.
    pub const TAM_EVENT_NOTIFY: FeaturesDesired = FeaturesDesired(0x04);

    /// Features requested when the caller does not choose.
    pub const DEFAULT: FeaturesDesired = Self::PACKET_RX.union(Self::LINKSCAN);

    const ALL: [(FeaturesDesired, &'static str); 3] = [
        (Self::PACKET_RX, "PACKET_RX"),
        (Self::LINKSCAN, "LINKSCAN"),
        (Self::TAM_EVENT_NOTIFY, "TAM_EVENT_NOTIFY"),
    ];

    /// Keeps only known feature bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        FeaturesDesired(bits & 0x07)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn union(self, other: FeaturesDesired) -> Self {
        FeaturesDesired(self.0 | other.0)
    }

    pub const fn contains(&self, other: FeaturesDesired) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for FeaturesDesired {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for FeaturesDesired {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for FeaturesDesired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names: Vec<&str> = Self::ALL
            .iter()
            .filter(|(feature, _)| self.contains(*feature))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}
