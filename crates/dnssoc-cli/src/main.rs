//! dnssoc - correlate passive-DNS logs against threat intelligence.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dnssoc_cli::run().await
}
