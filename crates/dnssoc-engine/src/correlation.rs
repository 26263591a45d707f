//! Time-window correlation of observations against the indicator set.

use std::path::Path;

use chrono::{DateTime, Utc};
use dnssoc_core::{DnsObservation, IndicatorKind, Match, MatchedField, Result};
use tracing::{debug, trace};

use crate::indicators::IndicatorSet;
use crate::parse::LogFile;

/// Half-open time window `[start, end)` a record must fall into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl CorrelationWindow {
    /// Create a window; `start == end` is a valid, empty window
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window start (inclusive)
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Window end (exclusive)
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether the timestamp falls inside the window
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Correlates parsed records against an indicator set
pub struct Correlator<'a> {
    indicators: &'a IndicatorSet,
    window: CorrelationWindow,
}

impl<'a> Correlator<'a> {
    /// Create a correlator over the given set and window
    #[must_use]
    pub const fn new(indicators: &'a IndicatorSet, window: CorrelationWindow) -> Self {
        Self { indicators, window }
    }

    /// The window this correlator applies
    #[must_use]
    pub const fn window(&self) -> CorrelationWindow {
        self.window
    }

    /// All matches produced by one record.
    ///
    /// The query is tested against the domain set; every IP-valued field
    /// is tested against the networks independently, so one record can
    /// produce several matches. Records outside the window produce none.
    #[must_use]
    pub fn correlate_record(&self, record: &DnsObservation, source_file: &Path) -> Vec<Match> {
        if !self.window.contains(record.timestamp) {
            return Vec::new();
        }

        let mut matches = Vec::new();

        if self.indicators.matches_domain(&record.query) {
            matches.push(Match {
                record: record.clone(),
                kind: IndicatorKind::Domain,
                indicator: record.query.to_ascii_lowercase(),
                field: MatchedField::Query,
                source_file: source_file.to_path_buf(),
            });
        }

        for (field, ip) in record.ip_fields() {
            if let Some(network) = self.indicators.matches_ip(ip) {
                trace!(ip = %ip, network = %network, field = %field, "network indicator hit");
                matches.push(Match {
                    record: record.clone(),
                    kind: IndicatorKind::Ip,
                    indicator: network.to_string(),
                    field,
                    source_file: source_file.to_path_buf(),
                });
            }
        }

        matches
    }

    /// Correlate every record of one file, in file order.
    pub fn correlate_file(&self, file: &LogFile) -> Result<FileReport> {
        let mut matches = Vec::new();
        let mut records = 0usize;

        for record in file.records()? {
            records += 1;
            matches.extend(self.correlate_record(&record, file.path()));
        }

        debug!(
            path = %file.path().display(),
            records,
            matches = matches.len(),
            "correlated file"
        );

        Ok(FileReport { records, matches })
    }
}

/// Outcome of correlating a single file
#[derive(Debug)]
pub struct FileReport {
    /// Records parsed (malformed lines excluded)
    pub records: usize,
    /// Matches inside the window, in file order
    pub matches: Vec<Match>,
}
