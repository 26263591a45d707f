//! Append-only match output.
//!
//! Matches land in `matches.json` under the output directory, one JSON
//! document per line, each batch sorted by record timestamp before it is
//! appended. After a non-empty batch the cursor advances to the newest
//! timestamp written; an empty batch leaves both files untouched.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use dnssoc_core::{EnrichedMatch, IndicatorKind, IntelContext, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::cursor::CursorStore;

const MATCHES_FILE: &str = "matches.json";

/// Writes enriched matches and advances the cursor
pub struct OutputSink {
    matches_path: PathBuf,
    cursor: CursorStore,
}

/// What a [`OutputSink::persist`] call wrote
#[derive(Debug)]
pub struct PersistSummary {
    /// Number of match documents appended
    pub written: usize,
    /// Cursor value after the batch, if it advanced
    pub cursor: Option<DateTime<Utc>>,
}

impl OutputSink {
    /// Create a sink under `output_dir`, creating the directory if needed
    pub fn new(output_dir: impl Into<PathBuf>, cursor: CursorStore) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            matches_path: output_dir.join(MATCHES_FILE),
            cursor,
        })
    }

    #[must_use]
    pub fn matches_path(&self) -> &Path {
        &self.matches_path
    }

    /// Append a batch of matches in timestamp order and advance the cursor.
    ///
    /// Sorting is stable, so matches sharing a timestamp keep their batch
    /// order. An empty batch writes nothing and leaves the cursor alone.
    pub fn persist(&self, mut batch: Vec<EnrichedMatch>) -> Result<PersistSummary> {
        if batch.is_empty() {
            debug!("no matches to persist, cursor unchanged");
            return Ok(PersistSummary {
                written: 0,
                cursor: None,
            });
        }

        batch.sort_by_key(EnrichedMatch::timestamp);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.matches_path)?;
        let mut writer = BufWriter::new(file);
        for entry in &batch {
            serde_json::to_writer(&mut writer, &OutputDocument::from(entry))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        // Batch is sorted, so the last element carries the newest timestamp.
        let newest = batch[batch.len() - 1].timestamp();
        self.cursor.store(newest)?;

        let written = batch.len();
        info!(
            written,
            path = %self.matches_path.display(),
            cursor = %newest.to_rfc3339_opts(SecondsFormat::Nanos, true),
            "matches persisted"
        );
        Ok(PersistSummary {
            written,
            cursor: Some(newest),
        })
    }
}

/// One line of `matches.json`
#[derive(Serialize)]
struct OutputDocument<'a> {
    timestamp: String,
    query: &'a str,
    matched_indicator_type: &'a str,
    matched_indicator_value: &'a str,
    source_file: String,
    intelligence_context: &'a [IntelContext],
}

impl<'a> From<&'a EnrichedMatch> for OutputDocument<'a> {
    fn from(entry: &'a EnrichedMatch) -> Self {
        Self {
            timestamp: entry
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            query: &entry.matched.record.query,
            matched_indicator_type: match entry.matched.kind {
                IndicatorKind::Domain => "domain",
                IndicatorKind::Ip => "ip",
            },
            matched_indicator_value: &entry.matched.indicator,
            source_file: entry.matched.source_file.display().to_string(),
            intelligence_context: &entry.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnssoc_core::{DnsObservation, LogEncoding, Match, MatchedField};

    fn enriched(timestamp: &str, indicator: &str, context: Vec<IntelContext>) -> EnrichedMatch {
        EnrichedMatch {
            matched: Match {
                record: DnsObservation {
                    timestamp: timestamp.parse().unwrap(),
                    query: indicator.to_uppercase(),
                    query_type: Some("A".to_string()),
                    answers: vec![],
                    client_ip: None,
                    resolver_ip: None,
                    encoding: LogEncoding::Full,
                },
                kind: IndicatorKind::Domain,
                indicator: indicator.to_string(),
                field: MatchedField::Query,
                source_file: "dns/today.json".into(),
            },
            context,
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn persist_sorts_batch_and_advances_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let sink = OutputSink::new(dir.path(), cursor.clone()).unwrap();

        let batch = vec![
            enriched("2024-05-01T18:00:00Z", "late.com", vec![]),
            enriched("2024-05-01T06:00:00Z", "early.com", vec![]),
            enriched("2024-05-01T12:00:00Z", "noon.com", vec![]),
        ];
        let summary = sink.persist(batch).unwrap();

        assert_eq!(summary.written, 3);
        let lines = read_lines(sink.matches_path());
        assert_eq!(lines[0]["matched_indicator_value"], "early.com");
        assert_eq!(lines[1]["matched_indicator_value"], "noon.com");
        assert_eq!(lines[2]["matched_indicator_value"], "late.com");

        let expected: DateTime<Utc> = "2024-05-01T18:00:00Z".parse().unwrap();
        assert_eq!(summary.cursor, Some(expected));
        assert_eq!(cursor.read().unwrap(), Some(expected));
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        cursor
            .store("2024-04-01T00:00:00Z".parse().unwrap())
            .unwrap();
        let before = std::fs::read(cursor.path()).unwrap();

        let sink = OutputSink::new(dir.path(), cursor.clone()).unwrap();
        let summary = sink.persist(Vec::new()).unwrap();

        assert_eq!(summary.written, 0);
        assert_eq!(summary.cursor, None);
        assert!(!sink.matches_path().exists());
        assert_eq!(std::fs::read(cursor.path()).unwrap(), before);
    }

    #[test]
    fn documents_carry_the_output_schema() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path(), CursorStore::new(dir.path().join("cursor"))).unwrap();

        let context = vec![IntelContext {
            event_id: "1042".to_string(),
            tags: vec!["tlp:red".to_string()],
            confidence: Some(80),
            source: "misp-main".to_string(),
        }];
        sink.persist(vec![enriched("2024-05-01T12:00:00.5Z", "evil.com", context)])
            .unwrap();

        let lines = read_lines(sink.matches_path());
        assert_eq!(lines.len(), 1);
        let doc = &lines[0];
        assert_eq!(doc["timestamp"], "2024-05-01T12:00:00.500000000Z");
        assert_eq!(doc["query"], "EVIL.COM");
        assert_eq!(doc["matched_indicator_type"], "domain");
        assert_eq!(doc["matched_indicator_value"], "evil.com");
        assert_eq!(doc["source_file"], "dns/today.json");
        assert_eq!(doc["intelligence_context"][0]["event_id"], "1042");
        assert_eq!(doc["intelligence_context"][0]["tags"][0], "tlp:red");
        assert_eq!(doc["intelligence_context"][0]["confidence"], 80);
        assert_eq!(doc["intelligence_context"][0]["source"], "misp-main");
    }

    #[test]
    fn repeated_persists_append() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let sink = OutputSink::new(dir.path(), cursor.clone()).unwrap();

        sink.persist(vec![enriched("2024-05-01T06:00:00Z", "one.com", vec![])])
            .unwrap();
        sink.persist(vec![enriched("2024-05-01T07:00:00Z", "two.com", vec![])])
            .unwrap();

        let lines = read_lines(sink.matches_path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["matched_indicator_value"], "one.com");
        assert_eq!(lines[1]["matched_indicator_value"], "two.com");
        assert_eq!(
            cursor.read().unwrap(),
            Some("2024-05-01T07:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn equal_timestamps_keep_batch_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path(), CursorStore::new(dir.path().join("cursor"))).unwrap();

        let batch = vec![
            enriched("2024-05-01T12:00:00Z", "first.com", vec![]),
            enriched("2024-05-01T12:00:00Z", "second.com", vec![]),
        ];
        sink.persist(batch).unwrap();

        let lines = read_lines(sink.matches_path());
        assert_eq!(lines[0]["matched_indicator_value"], "first.com");
        assert_eq!(lines[1]["matched_indicator_value"], "second.com");
    }
}
