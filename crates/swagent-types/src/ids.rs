//! Strongly typed identities.
//!
//! Switch, port, router and client identities are all plain integers on
//! the wire. Wrapping them keeps a port id from being passed where a
//! switch id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $raw:ty, $label:literal) => {
        #[doc = concat!("Typed ", $label, " identity.")]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($raw);

        impl $name {
            /// Wraps a raw identity.
            pub const fn new(raw: $raw) -> Self {
                Self(raw)
            }

            /// Returns the raw identity.
            pub const fn as_raw(&self) -> $raw {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for $raw {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(SwitchId, i64, "switch");
define_id!(PortId, u32, "logical port");
define_id!(RouterId, u32, "router (VRF)");
define_id!(ClientId, u32, "route client");

impl ClientId {
    /// Client id used by BGP.
    pub const BGPD: ClientId = ClientId(0);
    /// Client id used for statically configured routes.
    pub const STATIC_ROUTE: ClientId = ClientId(1);
}

impl RouterId {
    /// The default VRF.
    pub const DEFAULT: RouterId = RouterId(0);
}
