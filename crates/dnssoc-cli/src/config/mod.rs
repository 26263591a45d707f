//! Configuration management.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::Deserialize;

/// CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default logging level or filter directive.
    #[serde(default = "default_logging")]
    pub logging: String,

    /// Defaults for the correlate command.
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Enrichment tuning.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Intelligence servers, queried in order.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// File locations for the correlate command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorrelationConfig {
    /// Directory receiving matches.json and the cursor file.
    pub output_dir: Option<PathBuf>,

    /// File with one malicious domain per line.
    pub malicious_domains_file: Option<PathBuf>,

    /// File with one malicious IP address or CIDR network per line.
    pub malicious_ips_file: Option<PathBuf>,

    /// Cursor file location (default: `<output_dir>/cursor`).
    pub cursor_file: Option<PathBuf>,
}

/// Enrichment tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Bound on concurrently in-flight server queries.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Per-query timeout in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

/// One MISP-compatible intelligence server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    /// Display name used in logs and context entries (default: URL host).
    pub name: Option<String>,

    /// Server base URL.
    pub url: String,

    /// API key sent in the Authorization header.
    pub api_key: String,

    /// Request budget per second against this server.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: default_logging(),
            correlation: CorrelationConfig::default(),
            enrichment: EnrichmentConfig::default(),
            servers: Vec::new(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "dnssoc", "dnssoc")
            .context("could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicitly named file must exist and parse. Without one the
    /// default location is tried, and a missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                Self::read(path).with_context(|| format!("loading config {}", path.display()))
            }
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::read(&path).with_context(|| format!("loading config {}", path.display()))
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

// Default value functions for serde.
fn default_logging() -> String {
    String::from("info")
}

const fn default_max_in_flight() -> usize {
    8
}

const fn default_query_timeout_secs() -> u64 {
    10
}

const fn default_requests_per_second() -> u32 {
    10
}
