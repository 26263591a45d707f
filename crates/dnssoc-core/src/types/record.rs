use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::matched::MatchedField;

/// Wire encoding of a passive-DNS log file
///
/// Detected once per file from its first non-empty line; every record in a
/// file shares the same encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    /// One JSON object per line with named fields
    Full,
    /// One JSON array per line with positional fields
    Compact,
}

impl std::fmt::Display for LogEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// A single passive-DNS observation parsed from a log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsObservation {
    /// When the resolution was observed
    pub timestamp: DateTime<Utc>,

    /// The queried domain, exactly as observed
    pub query: String,

    /// DNS query type (A, AAAA, ...), when the log carries it
    #[serde(default)]
    pub query_type: Option<String>,

    /// Resolved answers: IP literals or CNAME targets, possibly empty
    #[serde(default)]
    pub answers: Vec<String>,

    /// Client address that issued the query
    #[serde(default)]
    pub client_ip: Option<IpAddr>,

    /// Resolver that answered the query
    #[serde(default)]
    pub resolver_ip: Option<IpAddr>,

    /// Encoding of the file this record came from
    pub encoding: LogEncoding,
}

impl DnsObservation {
    /// Every IP-valued field of this record, paired with its position.
    ///
    /// Answers that are not IP literals (CNAME targets) are skipped.
    pub fn ip_fields(&self) -> impl Iterator<Item = (MatchedField, IpAddr)> + '_ {
        let answers = self
            .answers
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.parse().ok().map(|ip| (MatchedField::Answer(i), ip)));

        let client = self.client_ip.map(|ip| (MatchedField::ClientIp, ip));
        let resolver = self.resolver_ip.map(|ip| (MatchedField::ResolverIp, ip));

        answers.chain(client).chain(resolver)
    }
}
