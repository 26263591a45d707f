//! In-memory indicator set built once per run.
//!
//! Domains match exactly (case-insensitive); networks match by CIDR
//! containment with longest-prefix precedence. The set is immutable after
//! [`IndicatorSetBuilder::build`] and safe to share across threads.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;

use dnssoc_core::{IpNetwork, Result};
use tracing::{debug, warn};

/// Immutable set of malicious domains and networks
#[derive(Debug, Default)]
pub struct IndicatorSet {
    domains: HashSet<String>,
    networks: Vec<IpNetwork>,
}

impl IndicatorSet {
    /// Start building a set
    #[must_use]
    pub fn builder() -> IndicatorSetBuilder {
        IndicatorSetBuilder::default()
    }

    /// Number of domain indicators
    #[must_use]
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Number of network indicators
    #[must_use]
    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    /// True when the set holds no indicators at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.networks.is_empty()
    }

    /// Exact, case-insensitive domain membership
    #[must_use]
    pub fn matches_domain(&self, query: &str) -> bool {
        self.domains.contains(&query.to_ascii_lowercase())
    }

    /// The most specific network containing the address, if any.
    ///
    /// Networks are held sorted by descending prefix length, so the first
    /// containing entry is the longest-prefix match.
    #[must_use]
    pub fn matches_ip(&self, ip: IpAddr) -> Option<&IpNetwork> {
        self.networks.iter().find(|net| net.contains(ip))
    }
}

/// Builder for [`IndicatorSet`]
#[derive(Debug, Default)]
pub struct IndicatorSetBuilder {
    domains: HashSet<String>,
    networks: Vec<IpNetwork>,
}

impl IndicatorSetBuilder {
    /// Add one domain indicator, normalized to lowercase
    pub fn domain(&mut self, value: &str) -> &mut Self {
        let value = value.trim();
        if !value.is_empty() {
            self.domains.insert(value.to_ascii_lowercase());
        }
        self
    }

    /// Add one network indicator; bare addresses become host networks.
    ///
    /// Values that fail to parse are dropped with a warning, never an error.
    pub fn network(&mut self, value: &str) -> &mut Self {
        let value = value.trim();
        if value.is_empty() {
            return self;
        }
        match value.parse::<IpNetwork>() {
            Ok(net) => {
                if !self.networks.contains(&net) {
                    self.networks.push(net);
                }
            }
            Err(e) => {
                warn!(indicator = value, error = %e, "dropping malformed network indicator");
            }
        }
        self
    }

    /// Load domain indicators from a one-per-line file.
    ///
    /// Blank lines and `#` comments are ignored.
    pub fn domains_from_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        for line in indicator_lines(path)? {
            self.domain(&line);
        }
        debug!(path = %path.display(), total = self.domains.len(), "loaded domain indicators");
        Ok(self)
    }

    /// Load network indicators from a one-per-line file.
    pub fn networks_from_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        for line in indicator_lines(path)? {
            self.network(&line);
        }
        debug!(path = %path.display(), total = self.networks.len(), "loaded network indicators");
        Ok(self)
    }

    /// Finish the set; networks end up sorted most-specific first
    #[must_use]
    pub fn build(mut self) -> IndicatorSet {
        self.networks
            .sort_by(|a, b| b.prefix_len().cmp(&a.prefix_len()));
        IndicatorSet {
            domains: self.domains,
            networks: self.networks,
        }
    }
}

fn indicator_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}
