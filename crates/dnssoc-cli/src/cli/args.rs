//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Correlate passive-DNS observation logs with threat intelligence
///
/// Matches DNS queries and resolved addresses against malicious domain
/// and network indicators, enriches hits with event context from the
/// configured intelligence servers, and appends them to matches.json.
#[derive(Parser, Debug)]
#[command(name = "dnssoc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long, env = "DNSSOC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive (e.g. info, dnssoc_engine=debug)
    #[arg(long, global = true)]
    pub logging: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Correlate DNS observation logs against the indicator files
    Correlate(CorrelateArgs),

    /// Refresh indicator files from the intelligence servers
    FetchIocs(FetchIocsArgs),
}

// ============================================================================
// Correlate command
// ============================================================================

#[derive(Args, Debug)]
pub struct CorrelateArgs {
    /// Log files or directories to correlate
    pub files: Vec<PathBuf>,

    /// Start of the correlation window (RFC 3339; defaults to the cursor)
    #[arg(short = 's', long)]
    pub start_date: Option<String>,

    /// End of the correlation window (RFC 3339; defaults to now)
    #[arg(short = 'e', long)]
    pub end_date: Option<String>,

    /// Directory receiving matches.json and the cursor file
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// File with one malicious domain per line
    #[arg(long)]
    pub malicious_domains_file: Option<PathBuf>,

    /// File with one malicious IP address or CIDR network per line
    #[arg(long)]
    pub malicious_ips_file: Option<PathBuf>,

    /// Delete input files once their matches are persisted
    #[arg(short = 'D', long)]
    pub delete_on_success: bool,
}

// ============================================================================
// Fetch-iocs command
// ============================================================================

#[derive(Args, Debug)]
pub struct FetchIocsArgs {
    /// Domain indicator file to rewrite
    #[arg(long)]
    pub malicious_domains_file: Option<PathBuf>,

    /// IP indicator file to rewrite
    #[arg(long)]
    pub malicious_ips_file: Option<PathBuf>,
}
