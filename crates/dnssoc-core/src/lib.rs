//! Core types and errors for the dnssoc correlation suite.
//!
//! This crate provides the foundational types used across dnssoc:
//!
//! - **Types**: passive-DNS observations, indicators, matches and their
//!   enriched forms
//! - **Errors**: the shared [`SocError`] taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use dnssoc_core::{DnsObservation, Result};
//!
//! fn process(record: &DnsObservation) -> Result<()> {
//!     println!("{} -> {:?}", record.query, record.answers);
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/dnssoc-core/0.3.0")]

mod error;
pub mod types;

pub use error::{Result, SocError};
pub use types::*;
