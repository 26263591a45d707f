//! # dnssoc-cli
//!
//! Command-line interface for passive-DNS threat-intelligence correlation.
//!
//! ## Features
//!
//! - **Correlate**: match DNS observation logs against indicator files,
//!   enrich hits with MISP event context, append to `matches.json`
//! - **Fetch IOCs**: refresh the local indicator files from the
//!   configured intelligence servers
//! - **Incremental runs**: a cursor file remembers how far correlation
//!   has progressed

pub mod cli;
pub mod config;

pub use cli::run;
