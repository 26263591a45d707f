//! Passive-DNS log parsing.
//!
//! Each log file carries records in one of two encodings: `full` (one JSON
//! object per line with named fields) or `compact` (one positional JSON
//! array per line). The encoding is detected from the first non-empty line
//! and applies to the whole file. Malformed lines never abort a file; they
//! are logged and skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dnssoc_core::{DnsObservation, LogEncoding, Result, SocError};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A passive-DNS log file with a detected encoding
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    encoding: LogEncoding,
}

impl LogFile {
    /// Open a log file and detect its encoding from the first non-empty line.
    ///
    /// Returns `Ok(None)` for files that hold no parseable records at all:
    /// empty files, files whose first line is not a JSON object or array,
    /// and files that are not line-oriented text. Only failing to open the
    /// file is an error; the caller decides whether that is fatal.
    pub fn open(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    debug!(path = %path.display(), "empty log file, skipping");
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "not a text log file, skipping");
                    return Ok(None);
                }
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        let encoding = match serde_json::from_str::<Value>(line.trim()) {
            Ok(Value::Object(_)) => LogEncoding::Full,
            Ok(Value::Array(_)) => LogEncoding::Compact,
            Ok(_) | Err(_) => {
                warn!(path = %path.display(), "first line is not a JSON record, skipping file");
                return Ok(None);
            }
        };

        debug!(path = %path.display(), encoding = %encoding, "detected log encoding");
        Ok(Some(Self {
            path: path.to_path_buf(),
            encoding,
        }))
    }

    /// The file's detected encoding
    #[must_use]
    pub const fn encoding(&self) -> LogEncoding {
        self.encoding
    }

    /// The file's path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate the file's records from the beginning.
    ///
    /// Malformed lines are dropped with a warning; the iterator continues
    /// with the next line.
    pub fn records(&self) -> Result<Records> {
        let file = File::open(&self.path)?;
        Ok(Records {
            lines: BufReader::new(file).lines(),
            path: self.path.clone(),
            encoding: self.encoding,
            line_no: 0,
        })
    }
}

/// Lazy record iterator over one log file
pub struct Records {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    encoding: LogEncoding,
    line_no: usize,
}

impl Iterator for Records {
    type Item = DnsObservation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "read error, stopping file");
                    return None;
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match parse_line(trimmed, self.encoding, &self.path, self.line_no) {
                Ok(record) => return Some(record),
                Err(e) => warn!(error = %e, "skipping malformed record"),
            }
        }
    }
}

fn parse_line(
    line: &str,
    encoding: LogEncoding,
    path: &Path,
    line_no: usize,
) -> Result<DnsObservation> {
    let parsed = match encoding {
        LogEncoding::Full => parse_full(line),
        LogEncoding::Compact => parse_compact(line),
    };
    parsed.map_err(|reason| SocError::Record {
        path: path.to_path_buf(),
        line: line_no,
        reason,
    })
}

/// Named-field wire form; unknown fields are ignored
#[derive(Deserialize)]
struct FullRecord {
    timestamp: String,
    query: String,
    #[serde(default)]
    query_type: Option<String>,
    #[serde(default)]
    answers: Vec<String>,
    #[serde(default)]
    client_ip: Option<String>,
    #[serde(default)]
    resolver_ip: Option<String>,
}

fn parse_full(line: &str) -> std::result::Result<DnsObservation, String> {
    let wire: FullRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
    build_record(
        &wire.timestamp,
        wire.query,
        wire.query_type,
        wire.answers,
        wire.client_ip.as_deref(),
        wire.resolver_ip.as_deref(),
        LogEncoding::Full,
    )
}

// Positional order fixed by the upstream logger:
// [timestamp, query, query_type, answers, client_ip, resolver_ip]
fn parse_compact(line: &str) -> std::result::Result<DnsObservation, String> {
    let wire: Vec<Value> = serde_json::from_str(line).map_err(|e| e.to_string())?;

    let timestamp = wire
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| "missing timestamp".to_string())?;
    let query = wire
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| "missing query".to_string())?
        .to_string();
    let query_type = wire.get(2).and_then(Value::as_str).map(String::from);
    let answers = match wire.get(3) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };
    let client_ip = wire.get(4).and_then(Value::as_str);
    let resolver_ip = wire.get(5).and_then(Value::as_str);

    build_record(
        timestamp,
        query,
        query_type,
        answers,
        client_ip,
        resolver_ip,
        LogEncoding::Compact,
    )
}

fn build_record(
    timestamp: &str,
    query: String,
    query_type: Option<String>,
    answers: Vec<String>,
    client_ip: Option<&str>,
    resolver_ip: Option<&str>,
    encoding: LogEncoding,
) -> std::result::Result<DnsObservation, String> {
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {timestamp:?}: {e}"))?;

    if query.is_empty() {
        return Err("empty query".to_string());
    }

    // Unparsable IP slots degrade to None; the record itself survives.
    Ok(DnsObservation {
        timestamp,
        query,
        query_type,
        answers,
        client_ip: client_ip.and_then(|s| s.parse::<IpAddr>().ok()),
        resolver_ip: resolver_ip.and_then(|s| s.parse::<IpAddr>().ok()),
        encoding,
    })
}
