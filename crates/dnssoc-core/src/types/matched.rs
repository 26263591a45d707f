use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::indicator::IndicatorKind;
use super::record::DnsObservation;

/// Which field of a record an indicator matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    /// The queried domain
    Query,
    /// One resolved answer, by index
    Answer(usize),
    /// The querying client address
    ClientIp,
    /// The answering resolver address
    ResolverIp,
}

impl std::fmt::Display for MatchedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Answer(i) => write!(f, "answer[{i}]"),
            Self::ClientIp => write!(f, "client_ip"),
            Self::ResolverIp => write!(f, "resolver_ip"),
        }
    }
}

/// A record that matched an indicator inside the correlation window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// The observation that matched
    pub record: DnsObservation,

    /// Kind of the matching indicator
    pub kind: IndicatorKind,

    /// The matching indicator in display form (domain or CIDR)
    pub indicator: String,

    /// Which field of the record matched
    pub field: MatchedField,

    /// Log file the record came from
    pub source_file: PathBuf,
}

impl Match {
    /// Timestamp of the underlying observation
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }
}

/// Intelligence context contributed by one server for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelContext {
    /// Identifier of the event the indicator belongs to
    pub event_id: String,

    /// Tags attached to the indicator or its event
    #[serde(default)]
    pub tags: Vec<String>,

    /// Server-assigned confidence, when the server reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,

    /// Name of the server that contributed this context
    pub source: String,
}

/// A match together with the context gathered for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedMatch {
    /// The underlying match
    pub matched: Match,

    /// Context from every server that answered, in provider order.
    /// Empty when all lookups failed.
    #[serde(default)]
    pub context: Vec<IntelContext>,
}

impl EnrichedMatch {
    /// Timestamp of the underlying observation
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.matched.record.timestamp
    }
}
