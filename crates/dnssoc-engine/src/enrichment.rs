//! Concurrent match enrichment against intelligence servers.
//!
//! Every (match, server) pair becomes one lookup. Lookups run concurrently
//! under a shared semaphore; a failed or timed-out lookup contributes
//! nothing to its match, and the match itself is always kept. Losing every
//! server therefore degrades output to matches with empty context instead
//! of losing the run.

use std::sync::Arc;
use std::time::Duration;

use dnssoc_core::{EnrichedMatch, IntelContext, Match};
use dnssoc_intel::IntelProvider;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Default bound on in-flight server queries
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Default per-query timeout
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Enriches matches with context from the configured intelligence servers
pub struct Enricher {
    providers: Vec<Arc<dyn IntelProvider>>,
    max_in_flight: usize,
    query_timeout: Duration,
}

impl Enricher {
    /// Create an enricher over the given providers
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn IntelProvider>>) -> Self {
        Self {
            providers,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Bound the number of concurrently in-flight server queries
    #[must_use]
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = limit.max(1);
        self
    }

    /// Set the per-query timeout
    #[must_use]
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Enrich a batch of matches, preserving batch order.
    ///
    /// Context entries are deduplicated by event id within each match,
    /// first occurrence wins (provider order, then response order).
    pub async fn enrich(&self, matches: Vec<Match>) -> Vec<EnrichedMatch> {
        if matches.is_empty() || self.providers.is_empty() {
            return matches
                .into_iter()
                .map(|matched| EnrichedMatch {
                    matched,
                    context: Vec::new(),
                })
                .collect();
        }

        debug!(
            matches = matches.len(),
            servers = self.providers.len(),
            limit = self.max_in_flight,
            "enriching batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));

        let futures: Vec<_> = matches
            .iter()
            .map(|m| self.enrich_one(m, &semaphore))
            .collect();
        let contexts = join_all(futures).await;

        matches
            .into_iter()
            .zip(contexts)
            .map(|(matched, context)| EnrichedMatch { matched, context })
            .collect()
    }

    async fn enrich_one(&self, matched: &Match, semaphore: &Arc<Semaphore>) -> Vec<IntelContext> {
        let lookups = self
            .providers
            .iter()
            .map(|provider| self.lookup(provider.as_ref(), &matched.indicator, semaphore));
        let results = join_all(lookups).await;

        let mut context: Vec<IntelContext> = Vec::new();
        for entry in results.into_iter().flatten() {
            if !context.iter().any(|c| c.event_id == entry.event_id) {
                context.push(entry);
            }
        }
        context
    }

    async fn lookup(
        &self,
        provider: &dyn IntelProvider,
        value: &str,
        semaphore: &Arc<Semaphore>,
    ) -> Vec<IntelContext> {
        let Ok(_permit) = semaphore.acquire().await else {
            return Vec::new();
        };

        match tokio::time::timeout(self.query_timeout, provider.lookup(value)).await {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                warn!(server = provider.name(), value, error = %e, "context lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    server = provider.name(),
                    value,
                    timeout_secs = self.query_timeout.as_secs(),
                    "context lookup timed out"
                );
                Vec::new()
            }
        }
    }
}
