//! Persisted correlation cursor.
//!
//! The cursor file holds a single RFC 3339 timestamp and marks how far
//! correlation has progressed. Runs without an explicit start date resume
//! from it, and it only advances when a run actually wrote matches.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use dnssoc_core::{Result, SocError};
use tracing::{debug, warn};

/// Reads and writes the single-timestamp cursor file
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cursor, treating a corrupt file like a missing one.
    ///
    /// A cursor that cannot be read or parsed is worth a warning but not a
    /// failed run; the caller falls back to its default window start.
    #[must_use]
    pub fn load(&self) -> Option<DateTime<Utc>> {
        match self.read() {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable cursor");
                None
            }
        }
    }

    /// Read the cursor, reporting missing as `None` and corrupt as an error
    pub fn read(&self) -> Result<Option<DateTime<Utc>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SocError::Cursor {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let cursor = content
            .trim()
            .parse::<DateTime<Utc>>()
            .map_err(|e| SocError::Cursor {
                path: self.path.clone(),
                reason: format!("bad timestamp: {e}"),
            })?;
        Ok(Some(cursor))
    }

    /// Overwrite the cursor with `timestamp` at nanosecond precision
    pub fn store(&self, timestamp: DateTime<Utc>) -> Result<()> {
        let line = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
        std::fs::write(&self.path, format!("{line}\n"))?;
        debug!(path = %self.path.display(), cursor = %line, "cursor advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn store_then_read_round_trips_nanoseconds() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("cursor"));

        let ts: DateTime<Utc> = "2024-05-01T12:00:00.123456789Z".parse().unwrap();
        store.store(ts).unwrap();

        assert_eq!(store.read().unwrap(), Some(ts));
        assert_eq!(store.load(), Some(ts));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "2024-05-01T12:00:00.123456789Z\n");
    }

    #[test]
    fn missing_cursor_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("cursor"));

        assert_eq!(store.read().unwrap(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_cursor_errors_on_read_but_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursor");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "last tuesday").unwrap();

        let store = CursorStore::new(&path);
        assert!(matches!(store.read(), Err(SocError::Cursor { .. })));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn store_overwrites_previous_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("cursor"));

        let older: DateTime<Utc> = "2024-05-01T00:00:00Z".parse().unwrap();
        let newer: DateTime<Utc> = "2024-06-01T00:00:00Z".parse().unwrap();
        store.store(older).unwrap();
        store.store(newer).unwrap();

        assert_eq!(store.read().unwrap(), Some(newer));
    }
}
