//! `dnssoc fetch-iocs` - refresh indicator files from the servers.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use tracing::{info, warn};
use url::Url;

use dnssoc_intel::{AttributeType, RemoteAttribute};

use super::Context;
use crate::cli::args::FetchIocsArgs;

pub async fn execute(ctx: Context, args: FetchIocsArgs) -> Result<()> {
    let correlation = &ctx.config.correlation;
    let domains_file = args
        .malicious_domains_file
        .clone()
        .or_else(|| correlation.malicious_domains_file.clone());
    let ips_file = args
        .malicious_ips_file
        .clone()
        .or_else(|| correlation.malicious_ips_file.clone());
    if domains_file.is_none() && ips_file.is_none() {
        bail!(
            "no indicator files configured; pass --malicious-domains-file or \
             --malicious-ips-file, or set them under [correlation]"
        );
    }

    let providers = ctx.providers()?;
    if providers.is_empty() {
        bail!("no intelligence servers configured; add [[servers]] entries to the config");
    }

    // Collect into sorted sets so the files come out deterministic
    let mut domains: BTreeSet<String> = BTreeSet::new();
    let mut networks: BTreeSet<String> = BTreeSet::new();

    for provider in &providers {
        match provider.search(&AttributeType::ALL, true).await {
            Ok(attributes) => {
                info!(
                    server = provider.name(),
                    count = attributes.len(),
                    "fetched attributes"
                );
                for attr in attributes {
                    bucket_attribute(&attr, &mut domains, &mut networks);
                }
            }
            Err(e) => warn!(server = provider.name(), error = %e, "server skipped"),
        }
    }

    if let Some(path) = &domains_file {
        rewrite_if_changed(path, &domains)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &ips_file {
        rewrite_if_changed(path, &networks)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "{} {} domains, {} networks",
        "fetched:".bold(),
        domains.len().to_string().cyan(),
        networks.len().to_string().cyan()
    );
    Ok(())
}

/// Route one attribute into the domain or network bucket.
///
/// Composite values (`domain|ip`, `ip-src|port`) contribute their
/// indicator half; URL attributes contribute their host.
fn bucket_attribute(
    attr: &RemoteAttribute,
    domains: &mut BTreeSet<String>,
    networks: &mut BTreeSet<String>,
) {
    let value = attr.value.trim();
    if value.is_empty() {
        return;
    }

    match attr.kind {
        AttributeType::Domain | AttributeType::Hostname => {
            domains.insert(value.to_ascii_lowercase());
        }
        AttributeType::DomainIp => match value.split_once('|') {
            Some((domain, ip)) => {
                domains.insert(domain.to_ascii_lowercase());
                networks.insert(ip.to_string());
            }
            None => warn!(value, "malformed domain|ip attribute"),
        },
        AttributeType::HostnamePort => match value.split_once('|') {
            Some((host, _port)) => {
                domains.insert(host.to_ascii_lowercase());
            }
            None => warn!(value, "malformed hostname|port attribute"),
        },
        AttributeType::IpSrc | AttributeType::IpDst => {
            networks.insert(value.to_string());
        }
        AttributeType::IpSrcPort | AttributeType::IpDstPort => match value.split_once('|') {
            Some((ip, _port)) => {
                networks.insert(ip.to_string());
            }
            None => warn!(value, "malformed ip|port attribute"),
        },
        AttributeType::Url => match Url::parse(value) {
            Ok(url) => match url.host() {
                Some(url::Host::Domain(host)) => {
                    domains.insert(host.to_ascii_lowercase());
                }
                Some(url::Host::Ipv4(ip)) => {
                    networks.insert(ip.to_string());
                }
                Some(url::Host::Ipv6(ip)) => {
                    networks.insert(ip.to_string());
                }
                None => warn!(value, "url attribute without host"),
            },
            Err(e) => warn!(value, error = %e, "unparsable url attribute"),
        },
    }
}

/// Rewrite an indicator file only when its effective content changed.
///
/// Comments and blank lines in the existing file are ignored for the
/// comparison, so a manually annotated file that still lists the same
/// indicators is left alone.
fn rewrite_if_changed(path: &Path, values: &BTreeSet<String>) -> Result<()> {
    let current = match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ToString::to_string)
            .collect::<BTreeSet<String>>(),
        Err(e) if e.kind() == ErrorKind::NotFound => BTreeSet::new(),
        Err(e) => return Err(e.into()),
    };

    if current == *values {
        info!(path = %path.display(), "indicators unchanged");
        return Ok(());
    }

    let added = values.difference(&current).count();
    let removed = current.difference(values).count();

    let mut content = String::new();
    for value in values {
        content.push_str(value);
        content.push('\n');
    }
    std::fs::write(path, content)?;

    info!(path = %path.display(), added, removed, "indicator file rewritten");
    Ok(())
}
