use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for dnssoc operations
pub type Result<T> = std::result::Result<T, SocError>;

/// Errors that can occur while correlating and enriching passive-DNS logs
#[derive(Error, Debug)]
pub enum SocError {
    /// A log line could not be parsed as a DNS observation
    #[error("malformed record at {path}:{line}: {reason}")]
    Record {
        /// Source log file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// An indicator value could not be parsed
    #[error("malformed indicator {value:?}: {reason}")]
    Indicator {
        /// The offending value
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// An intelligence server rejected our credentials
    #[error("authentication failed for {server}")]
    Unauthorized {
        /// Name of the rejecting server
        server: String,
    },

    /// An intelligence server query failed
    #[error("query against {server} failed: {reason}")]
    Query {
        /// Name of the server
        server: String,
        /// Failure description
        reason: String,
    },

    /// An intelligence server query timed out
    #[error("query against {server} timed out after {seconds} seconds")]
    Timeout {
        /// Name of the server
        server: String,
        /// Configured timeout
        seconds: u64,
    },

    /// The cursor file exists but cannot be used
    #[error("unreadable cursor at {path}: {reason}")]
    Cursor {
        /// Cursor file path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SocError {
    /// Returns true if the error must abort the run instead of being
    /// absorbed at its call site.
    ///
    /// Per-record, per-indicator, per-server and cursor failures are
    /// recoverable: the pipeline logs them and continues with the rest of
    /// its input. Everything that makes the run's output impossible to
    /// produce or persist is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_) | Self::Json(_))
    }

    /// Returns true if the error came from an intelligence server
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::Query { .. } | Self::Timeout { .. }
        )
    }
}
