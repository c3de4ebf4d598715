//! Route destination prefixes.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// An IP prefix in CIDR notation (e.g. `10.0.0.0/24` or `2001:db8::/32`).
///
/// Serialized as its CIDR string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    address: IpAddr,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a new prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length is longer than the address
    /// (>32 for IPv4, >128 for IPv6).
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        let max_len = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max_len {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{}: length exceeds {}",
                address, prefix_len, max_len
            )));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    pub const fn address(&self) -> IpAddr {
        self.address
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_ipv4(&self) -> bool {
        self.address.is_ipv4()
    }

    /// Returns true for /32 (IPv4) and /128 (IPv6).
    pub const fn is_host_route(&self) -> bool {
        match self.address {
            IpAddr::V4(_) => self.prefix_len == 32,
            IpAddr::V6(_) => self.prefix_len == 128,
        }
    }

    pub const fn is_default(&self) -> bool {
        self.prefix_len == 0
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;
        let address: IpAddr = addr
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;
        IpPrefix::new(address, prefix_len)
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> Self {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse() {
        let v4: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert!(v4.is_ipv4());
        assert_eq!(v4.prefix_len(), 24);

        let v6: IpPrefix = "2401:db00::/64".parse().unwrap();
        assert!(!v6.is_ipv4());
        assert_eq!(v6.to_string(), "2401:db00::/64");
    }

    #[test]
    fn test_invalid() {
        assert!("10.0.0.0/33".parse::<IpPrefix>().is_err());
        assert!("2001:db8::/129".parse::<IpPrefix>().is_err());
        assert!("10.0.0.0".parse::<IpPrefix>().is_err());
        assert!("host/24".parse::<IpPrefix>().is_err());
    }

    #[test]
    fn test_host_and_default() {
        assert!("10.0.0.1/32".parse::<IpPrefix>().unwrap().is_host_route());
        assert!("::1/128".parse::<IpPrefix>().unwrap().is_host_route());
        assert!("0.0.0.0/0".parse::<IpPrefix>().unwrap().is_default());
    }

    #[test]
    fn test_serde_as_string() {
        let prefix: IpPrefix = "192.168.0.0/16".parse().unwrap();
        let json = serde_json::to_string(&prefix).unwrap();
        assert_eq!(json, "\"192.168.0.0/16\"");
        let back: IpPrefix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefix);
    }
}
