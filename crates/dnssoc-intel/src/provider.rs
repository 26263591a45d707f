//! Provider interface for threat-intelligence servers.

use async_trait::async_trait;
use dnssoc_core::{IntelContext, Result};

/// Indicator attribute types understood by intelligence servers.
///
/// Wire names follow the MISP attribute taxonomy; composite types
/// (`domain|ip`, `ip-src|port`) carry two values joined with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// `domain`
    Domain,
    /// `hostname`
    Hostname,
    /// `domain|ip`
    DomainIp,
    /// `hostname|port`
    HostnamePort,
    /// `ip-src`
    IpSrc,
    /// `ip-src|port`
    IpSrcPort,
    /// `ip-dst`
    IpDst,
    /// `ip-dst|port`
    IpDstPort,
    /// `url`
    Url,
}

impl AttributeType {
    /// Every attribute type the indicator fetch workflow requests
    pub const ALL: [Self; 9] = [
        Self::Domain,
        Self::Hostname,
        Self::DomainIp,
        Self::HostnamePort,
        Self::IpSrc,
        Self::IpSrcPort,
        Self::IpDst,
        Self::IpDstPort,
        Self::Url,
    ];

    /// The MISP wire name of this attribute type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Hostname => "hostname",
            Self::DomainIp => "domain|ip",
            Self::HostnamePort => "hostname|port",
            Self::IpSrc => "ip-src",
            Self::IpSrcPort => "ip-src|port",
            Self::IpDst => "ip-dst",
            Self::IpDstPort => "ip-dst|port",
            Self::Url => "url",
        }
    }

    /// Parse a MISP wire name; unhandled types map to `None`
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "domain" => Some(Self::Domain),
            "hostname" => Some(Self::Hostname),
            "domain|ip" => Some(Self::DomainIp),
            "hostname|port" => Some(Self::HostnamePort),
            "ip-src" => Some(Self::IpSrc),
            "ip-src|port" => Some(Self::IpSrcPort),
            "ip-dst" => Some(Self::IpDst),
            "ip-dst|port" => Some(Self::IpDstPort),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indicator value returned by a provider search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttribute {
    /// The indicator value as stored on the server
    pub value: String,
    /// Attribute type of the value
    pub kind: AttributeType,
}

/// A threat-intelligence server capable of indicator search and per-value
/// context lookup.
///
/// Implementations must tolerate being called concurrently; the enrichment
/// engine fans lookups out across matches and servers.
#[async_trait]
pub trait IntelProvider: Send + Sync {
    /// Short name identifying the server in logs and context entries
    fn name(&self) -> &str;

    /// Fetch all indicator values matching the given attribute types.
    ///
    /// With `active_only` set, only indicators flagged for detection are
    /// returned.
    async fn search(
        &self,
        filter: &[AttributeType],
        active_only: bool,
    ) -> Result<Vec<RemoteAttribute>>;

    /// Fetch intelligence context for a single indicator value.
    ///
    /// An unknown value yields an empty list, not an error.
    async fn lookup(&self, value: &str) -> Result<Vec<IntelContext>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in AttributeType::ALL {
            assert_eq!(AttributeType::from_wire(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_wire_names_are_none() {
        assert_eq!(AttributeType::from_wire("sha256"), None);
        assert_eq!(AttributeType::from_wire(""), None);
    }
}
