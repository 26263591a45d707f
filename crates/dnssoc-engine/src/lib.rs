//! Correlation and enrichment engine for passive-DNS observation logs.
//!
//! The pipeline runs in stages: input enumeration, per-file parsing,
//! window/indicator correlation, concurrent enrichment, and the sorted
//! append to the output stream. Everything upstream of enrichment is
//! sequential; enrichment fans out per (match, server) under a shared
//! concurrency bound.
//!
//! Failure handling follows one rule throughout: anything local to a
//! record, a file or a server is logged and skipped, and only failures
//! that make the run's output impossible to produce or persist surface
//! as errors.

#![doc(html_root_url = "https://docs.rs/dnssoc-engine/0.3.0")]

pub mod correlation;
pub mod cursor;
pub mod enrichment;
pub mod indicators;
pub mod inputs;
pub mod parse;
pub mod sink;

pub use correlation::{CorrelationWindow, Correlator, FileReport};
pub use cursor::CursorStore;
pub use enrichment::Enricher;
pub use indicators::{IndicatorSet, IndicatorSetBuilder};
pub use inputs::{collect_inputs, remove_inputs, InputFile};
pub use parse::LogFile;
pub use sink::{OutputSink, PersistSummary};
