//! Drives the feed provider and the normalizer to rebuild the fetched cache.

use crate::core::feed::{FeedProvider, is_fetchable};
use crate::core::normalizer::normalize_feed;
use crate::core::transaction::{MANUAL_SOURCE, PeriodKey, Transaction};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Period → source key → feed URL.
pub type SourceConfig = BTreeMap<PeriodKey, BTreeMap<String, String>>;

/// Result of one ingestion run.
#[derive(Debug)]
pub struct Ingestion {
    pub generation: u64,
    /// Fetched transactions per requested period, in request order.
    pub periods: Vec<(PeriodKey, Vec<Transaction>)>,
    /// Sources whose fetch failed, as (period, source key).
    pub failures: Vec<(PeriodKey, String)>,
}

/// Fans feed fetches out per (period, source) and gathers them back per period.
///
/// Every run takes a generation number. A run is current until a later one
/// starts; callers commit only current runs.
pub struct Ingestor<P: FeedProvider> {
    provider: P,
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<P: FeedProvider> Ingestor<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Whether any run is in flight. Advisory only.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Whether `generation` is the most recently started run.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Claims the next generation. Every earlier generation stops being current.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fetches and normalizes every configured feed of `periods` as run
    /// `generation`, claimed beforehand with [`Ingestor::begin`].
    pub async fn run(
        &self,
        generation: u64,
        periods: &[PeriodKey],
        config: &SourceConfig,
    ) -> Ingestion {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        info!("Starting ingestion #{generation} for {} periods", periods.len());

        let jobs: Vec<(usize, usize, PeriodKey, &str, &str)> = periods
            .iter()
            .enumerate()
            .flat_map(|(period_idx, period)| {
                config
                    .get(period)
                    .into_iter()
                    .flatten()
                    .filter(|(source, url)| {
                        source.as_str() != MANUAL_SOURCE && is_fetchable(url)
                    })
                    .enumerate()
                    .map(move |(source_idx, (source, url))| {
                        (period_idx, source_idx, *period, source.as_str(), url.as_str())
                    })
            })
            .collect();
        debug!("Ingestion #{generation} has {} feeds to fetch", jobs.len());

        let fetches = jobs
            .into_iter()
            .map(|(period_idx, source_idx, period, source, url)| async move {
                let result = self.provider.fetch_text(url).await;
                (period_idx, source_idx, period, source, result)
            });
        let mut results = join_all(fetches).await;
        results.sort_by_key(|(period_idx, source_idx, ..)| (*period_idx, *source_idx));

        let mut gathered: Vec<(PeriodKey, Vec<Transaction>)> =
            periods.iter().map(|p| (*p, Vec::new())).collect();
        let mut failures = Vec::new();
        for (period_idx, _, period, source, result) in results {
            match result {
                Ok(text) => {
                    let transactions = normalize_feed(&text, source);
                    debug!(
                        "{} transactions from {} for {}",
                        transactions.len(),
                        source,
                        period
                    );
                    gathered[period_idx].1.extend(transactions);
                }
                Err(e) => {
                    warn!(error = %e, %period, source, "Failed to fetch feed");
                    failures.push((period, source.to_string()));
                }
            }
        }

        info!(
            "Finished ingestion #{generation} with {} failed feeds",
            failures.len()
        );
        Ingestion {
            generation,
            periods: gathered,
            failures,
        }
    }
}
