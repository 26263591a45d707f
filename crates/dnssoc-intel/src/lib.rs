//! # dnssoc-intel
//!
//! Intelligence-server clients for the dnssoc correlation suite.
//!
//! The engine talks to threat-intelligence servers through the
//! [`IntelProvider`] trait; [`MispClient`] implements it for MISP-compatible
//! REST endpoints. Providers are constructed by the binary from its
//! configuration and injected wherever indicator search or match enrichment
//! happens, so everything downstream is testable with stub providers.
//!
//! # Example
//!
//! ```rust,ignore
//! use dnssoc_intel::{AttributeType, MispClient};
//!
//! let client = MispClient::builder("https://misp.example.org", "api-key")
//!     .name("misp-main")
//!     .build()?;
//! let domains = client.search(&[AttributeType::Domain], true).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/dnssoc-intel/0.3.0")]

mod client;
mod provider;

pub use client::{MispClient, MispClientBuilder};
pub use provider::{AttributeType, IntelProvider, RemoteAttribute};
