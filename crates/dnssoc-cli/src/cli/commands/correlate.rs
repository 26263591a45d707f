//! `dnssoc correlate` - match DNS observation logs against indicators.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info, warn};

use dnssoc_core::{IndicatorKind, LogEncoding};
use dnssoc_engine::{
    collect_inputs, remove_inputs, CorrelationWindow, Correlator, CursorStore, Enricher,
    IndicatorSet, IndicatorSetBuilder, LogFile, OutputSink, PersistSummary,
};
use dnssoc_intel::{AttributeType, IntelProvider};

use super::Context;
use crate::cli::args::CorrelateArgs;

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Encoding")]
    encoding: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Matches")]
    matches: usize,
}

pub async fn execute(ctx: Context, args: CorrelateArgs) -> Result<()> {
    let correlation = &ctx.config.correlation;

    // Resolve output locations
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| correlation.output_dir.clone())
        .context("no output directory; pass --output-dir or set correlation.output_dir")?;
    let cursor_path = correlation
        .cursor_file
        .clone()
        .unwrap_or_else(|| output_dir.join("cursor"));
    let cursor = CursorStore::new(cursor_path);
    let sink = OutputSink::new(&output_dir, cursor.clone())?;

    // Correlation window: explicit bounds win, otherwise resume from the
    // cursor and stop at the current instant
    let now = Utc::now();
    let end = match &args.end_date {
        Some(raw) => parse_window_bound(raw).context("invalid --end-date")?,
        None => now,
    };
    let start = match &args.start_date {
        Some(raw) => parse_window_bound(raw).context("invalid --start-date")?,
        None => cursor.load().unwrap_or(now),
    };
    if start >= end {
        warn!(%start, %end, "empty correlation window, nothing can match");
    }
    let window = CorrelationWindow::new(start, end);

    let providers = ctx.providers()?;

    let indicators = load_indicators(&ctx, &args, &providers).await?;
    if indicators.is_empty() {
        warn!("indicator set is empty, no matches are possible");
    } else {
        info!(
            domains = indicators.domain_count(),
            networks = indicators.network_count(),
            "indicator set loaded"
        );
    }

    if args.files.is_empty() {
        warn!("no log files or directories named");
    }
    let inputs = collect_inputs(&args.files)?;

    // Correlate file by file, bucketing matches by input encoding
    let correlator = Correlator::new(&indicators, window);
    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut rows: Vec<FileRow> = Vec::new();
    let mut skipped = 0usize;
    let mut full_bucket = Vec::new();
    let mut compact_bucket = Vec::new();

    for input in &inputs {
        progress.set_message(input.path.display().to_string());
        let outcome = LogFile::open(&input.path).and_then(|maybe| match maybe {
            Some(file) => {
                let report = correlator.correlate_file(&file)?;
                Ok(Some((file, report)))
            }
            None => Ok(None),
        });
        match outcome {
            Ok(Some((file, report))) => {
                rows.push(FileRow {
                    file: input.path.display().to_string(),
                    encoding: file.encoding().to_string(),
                    records: report.records,
                    matches: report.matches.len(),
                });
                match file.encoding() {
                    LogEncoding::Full => full_bucket.extend(report.matches),
                    LogEncoding::Compact => compact_bucket.extend(report.matches),
                }
            }
            Ok(None) => skipped += 1,
            Err(e) if input.explicit => {
                progress.finish_and_clear();
                return Err(e).with_context(|| format!("reading {}", input.path.display()));
            }
            Err(e) => {
                warn!(file = %input.path.display(), error = %e, "skipping unreadable input");
                skipped += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    // Enrich per bucket; the sink merges both into one sorted batch
    let enrichment = &ctx.config.enrichment;
    let enricher = Enricher::new(providers)
        .max_in_flight(enrichment.max_in_flight)
        .query_timeout(Duration::from_secs(enrichment.query_timeout_secs));

    let mut batch = enricher.enrich(full_bucket).await;
    batch.extend(enricher.enrich(compact_bucket).await);

    let summary = sink.persist(batch).context("persisting matches")?;

    if args.delete_on_success {
        remove_inputs(&args.files);
    }

    print_summary(&rows, skipped, &summary);
    Ok(())
}

/// Resolve the indicator set, preferring the files and falling back to
/// the intelligence servers per indicator kind.
async fn load_indicators(
    ctx: &Context,
    args: &CorrelateArgs,
    providers: &[Arc<dyn IntelProvider>],
) -> Result<IndicatorSet> {
    let correlation = &ctx.config.correlation;
    let domains_file = args
        .malicious_domains_file
        .clone()
        .or_else(|| correlation.malicious_domains_file.clone());
    let ips_file = args
        .malicious_ips_file
        .clone()
        .or_else(|| correlation.malicious_ips_file.clone());

    let mut builder = IndicatorSet::builder();

    match &domains_file {
        Some(path) => {
            builder
                .domains_from_file(path)
                .with_context(|| format!("reading domain indicators from {}", path.display()))?;
        }
        None => fetch_indicators(&mut builder, providers, IndicatorKind::Domain).await,
    }
    match &ips_file {
        Some(path) => {
            builder
                .networks_from_file(path)
                .with_context(|| format!("reading network indicators from {}", path.display()))?;
        }
        None => fetch_indicators(&mut builder, providers, IndicatorKind::Ip).await,
    }

    Ok(builder.build())
}

/// Pull indicators of one kind from every server, skipping failed servers
async fn fetch_indicators(
    builder: &mut IndicatorSetBuilder,
    providers: &[Arc<dyn IntelProvider>],
    kind: IndicatorKind,
) {
    let filter: &[AttributeType] = match kind {
        IndicatorKind::Domain => &[AttributeType::Domain],
        IndicatorKind::Ip => &[AttributeType::IpSrc, AttributeType::IpDst],
    };

    for provider in providers {
        match provider.search(filter, true).await {
            Ok(attributes) => {
                debug!(
                    server = provider.name(),
                    count = attributes.len(),
                    %kind,
                    "fetched indicators"
                );
                for attr in &attributes {
                    match kind {
                        IndicatorKind::Domain => builder.domain(&attr.value),
                        IndicatorKind::Ip => builder.network(&attr.value),
                    };
                }
            }
            Err(e) => {
                warn!(server = provider.name(), error = %e, %kind, "indicator fetch failed");
            }
        }
    }
}

/// Parse a window bound, accepting RFC 3339, a naive date-time, or a
/// bare date. Naive values are read as UTC.
fn parse_window_bound(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    anyhow::bail!("unparsable date {raw:?}; expected RFC 3339 or YYYY-MM-DD[THH:MM:SS]")
}

fn print_summary(rows: &[FileRow], skipped: usize, summary: &PersistSummary) {
    if !rows.is_empty() {
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
    if skipped > 0 {
        println!("{}", format!("{skipped} file(s) skipped").dimmed());
    }
    if summary.written > 0 {
        println!(
            "{} {} matches appended",
            "done:".bold(),
            summary.written.to_string().cyan()
        );
    } else {
        println!("{} no new matches", "done:".bold());
    }
}
