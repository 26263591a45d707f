//! Command implementations.

pub mod correlate;
pub mod fetch_iocs;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use dnssoc_intel::{IntelProvider, MispClient};

use crate::config::Config;

/// Shared context for all commands.
pub struct Context {
    /// Loaded configuration
    pub config: Config,
}

impl Context {
    /// Build one intelligence client per configured server.
    ///
    /// A misconfigured server entry is fatal; runtime failures against a
    /// reachable server are handled per query instead.
    pub fn providers(&self) -> Result<Vec<Arc<dyn IntelProvider>>> {
        let timeout = Duration::from_secs(self.config.enrichment.query_timeout_secs);

        let mut providers: Vec<Arc<dyn IntelProvider>> = Vec::new();
        for server in &self.config.servers {
            let mut builder = MispClient::builder(&server.url, &server.api_key)
                .timeout(timeout)
                .requests_per_second(server.requests_per_second);
            if let Some(name) = &server.name {
                builder = builder.name(name);
            }
            let client = builder
                .build()
                .with_context(|| format!("invalid server entry {:?}", server.url))?;
            providers.push(Arc::new(client));
        }
        Ok(providers)
    }
}
