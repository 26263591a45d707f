use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::SocError;

/// What kind of indicator produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// Exact domain name
    Domain,
    /// IP network in CIDR notation
    Ip,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain => write!(f, "domain"),
            Self::Ip => write!(f, "ip"),
        }
    }
}

/// An IP network in CIDR notation
///
/// A bare address parses as a host network (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix_len: u8,
}

impl IpNetwork {
    /// Create a network from an address and prefix length
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, SocError> {
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(SocError::Indicator {
                value: format!("{addr}/{prefix_len}"),
                reason: format!("prefix length exceeds {max}"),
            });
        }
        Ok(Self { addr, prefix_len })
    }

    /// The network address
    #[must_use]
    pub const fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The prefix length in bits
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether the given address falls inside this network.
    ///
    /// Address families are strict: a v4 network never contains a v6
    /// address and vice versa.
    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (ip, self.addr) {
            (IpAddr::V4(ip4), IpAddr::V4(net4)) => Self::contains_v4(ip4, net4, self.prefix_len),
            (IpAddr::V6(ip6), IpAddr::V6(net6)) => Self::contains_v6(ip6, net6, self.prefix_len),
            _ => false,
        }
    }

    fn contains_v4(ip: Ipv4Addr, network: Ipv4Addr, prefix_len: u8) -> bool {
        if prefix_len == 0 {
            return true;
        }
        let mask = !0u32 << (32 - prefix_len);
        (u32::from(ip) & mask) == (u32::from(network) & mask)
    }

    fn contains_v6(ip: Ipv6Addr, network: Ipv6Addr, prefix_len: u8) -> bool {
        if prefix_len == 0 {
            return true;
        }
        let mask = !0u128 << (128 - prefix_len);
        (u128::from(ip) & mask) == (u128::from(network) & mask)
    }
}

impl FromStr for IpNetwork {
    type Err = SocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse().map_err(|_| SocError::Indicator {
                    value: s.to_string(),
                    reason: "invalid network address".to_string(),
                })?;
                let prefix_len: u8 = prefix.parse().map_err(|_| SocError::Indicator {
                    value: s.to_string(),
                    reason: "invalid prefix length".to_string(),
                })?;
                Self::new(addr, prefix_len)
            }
            None => {
                let addr: IpAddr = s.parse().map_err(|_| SocError::Indicator {
                    value: s.to_string(),
                    reason: "invalid IP address".to_string(),
                })?;
                let prefix_len = match addr {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                Ok(Self { addr, prefix_len })
            }
        }
    }
}

impl std::fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}
