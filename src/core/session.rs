//! Application facade: selected periods, source configuration, the ledger and the
//! readiness state, kept in sync with the state store.

use crate::core::analytics::{self, Summary, TimeWindow, WindowReport};
use crate::core::config::SourceCatalog;
use crate::core::feed::FeedProvider;
use crate::core::ingest::{Ingestor, SourceConfig};
use crate::core::ledger::{Ledger, ManualEntryError, PeriodTransactions};
use crate::core::persist::{StateKey, StateStore, load_entry, save_entry};
use crate::core::transaction::{PeriodKey, Transaction};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// No period selected.
    Empty,
    /// A refresh is in flight.
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    PeriodsSelected,
    PeriodsCleared,
    RefreshStarted,
    RefreshCompleted,
}

impl AppState {
    pub fn next(self, event: StateEvent) -> AppState {
        match (self, event) {
            (_, StateEvent::PeriodsCleared) => AppState::Empty,
            (AppState::Empty, StateEvent::PeriodsSelected) => AppState::Loading,
            (_, StateEvent::RefreshStarted) => AppState::Loading,
            (AppState::Loading, StateEvent::RefreshCompleted) => AppState::Ready,
            (state, _) => state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No period is selected, nothing was fetched.
    NothingSelected,
    /// The run was the latest one and its result is now the fetched cache.
    Committed {
        generation: u64,
        failures: Vec<(PeriodKey, String)>,
    },
    /// A later refresh started while this one ran. Its result was dropped.
    Superseded { generation: u64 },
}

struct SessionState {
    state: AppState,
    selected: Vec<PeriodKey>,
    sources: SourceConfig,
    ledger: Ledger,
}

pub struct Session<P: FeedProvider> {
    store: Arc<dyn StateStore>,
    ingestor: Ingestor<P>,
    catalog: SourceCatalog,
    inner: Mutex<SessionState>,
}

impl<P: FeedProvider> Session<P> {
    /// Restores a session from `store`. Each entry that is missing or unreadable
    /// starts from its default. A restored session with selected periods is
    /// `Ready` on its cached data.
    pub async fn load(store: Arc<dyn StateStore>, provider: P, catalog: SourceCatalog) -> Self {
        let selected: Vec<PeriodKey> = load_entry(store.as_ref(), StateKey::SelectedPeriods).await;
        let sources: SourceConfig = load_entry(store.as_ref(), StateKey::SourceConfigs).await;
        let manual: PeriodTransactions =
            load_entry(store.as_ref(), StateKey::ManualTransactions).await;
        let ignored: BTreeSet<String> = load_entry(store.as_ref(), StateKey::IgnoredIds).await;
        let fetched: PeriodTransactions = load_entry(store.as_ref(), StateKey::FetchedCache).await;

        let state = if selected.is_empty() {
            AppState::Empty
        } else {
            AppState::Ready
        };
        info!(
            "Session loaded with {} selected periods and {} ignored ids",
            selected.len(),
            ignored.len()
        );

        Self {
            store,
            ingestor: Ingestor::new(provider),
            catalog,
            inner: Mutex::new(SessionState {
                state,
                selected,
                sources,
                ledger: Ledger::new(fetched, manual, ignored),
            }),
        }
    }

    async fn persist<T: Serialize + ?Sized>(&self, key: StateKey, value: &T) {
        if let Err(e) = save_entry(self.store.as_ref(), key, value).await {
            error!(error = ?e, "Failed to persist {key}");
        }
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    pub async fn state(&self) -> AppState {
        self.inner.lock().await.state
    }

    /// Whether a refresh is in flight. Advisory only.
    pub fn is_busy(&self) -> bool {
        self.ingestor.is_busy()
    }

    pub async fn selected_periods(&self) -> Vec<PeriodKey> {
        self.inner.lock().await.selected.clone()
    }

    pub async fn source_config(&self) -> SourceConfig {
        self.inner.lock().await.sources.clone()
    }

    pub async fn ignored_ids(&self) -> BTreeSet<String> {
        self.inner.lock().await.ledger.ignored().clone()
    }

    /// Replaces the period selection and refreshes it. Duplicates are dropped,
    /// first occurrence wins.
    pub async fn select_periods(&self, periods: Vec<PeriodKey>) -> RefreshOutcome {
        let mut seen = BTreeSet::new();
        let periods: Vec<PeriodKey> = periods.into_iter().filter(|p| seen.insert(*p)).collect();
        {
            let mut inner = self.inner.lock().await;
            inner.selected = periods.clone();
            inner.state = inner.state.next(if periods.is_empty() {
                StateEvent::PeriodsCleared
            } else {
                StateEvent::PeriodsSelected
            });
            self.persist(StateKey::SelectedPeriods, &inner.selected).await;
        }
        self.refresh().await
    }

    /// Replaces the source URLs of `period` and refreshes the selection.
    pub async fn set_sources(
        &self,
        period: PeriodKey,
        urls: BTreeMap<String, String>,
    ) -> RefreshOutcome {
        self.update_sources(period, |current| *current = urls).await;
        self.refresh().await
    }

    /// Sets (or with an empty `url`, clears) one source URL of `period`.
    pub async fn set_source_url(&self, period: PeriodKey, source: &str, url: &str) -> RefreshOutcome {
        self.update_sources(period, |current| {
            current.insert(source.to_string(), url.to_string());
        })
        .await;
        self.refresh().await
    }

    /// Edits the URLs of `period` in place and persists the result. Empty URLs
    /// are dropped, and so is a period left without any.
    async fn update_sources<F>(&self, period: PeriodKey, edit: F)
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut inner = self.inner.lock().await;
        let mut urls = inner.sources.remove(&period).unwrap_or_default();
        edit(&mut urls);
        urls.retain(|_, url| !url.trim().is_empty());
        if !urls.is_empty() {
            inner.sources.insert(period, urls);
        }
        self.persist(StateKey::SourceConfigs, &inner.sources).await;
    }

    /// Refetches every selected period and replaces their fetched cache.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (generation, periods, config) = {
            let mut inner = self.inner.lock().await;
            if inner.selected.is_empty() {
                inner.state = inner.state.next(StateEvent::PeriodsCleared);
                return RefreshOutcome::NothingSelected;
            }
            inner.state = inner.state.next(StateEvent::RefreshStarted);
            (self.ingestor.begin(), inner.selected.clone(), inner.sources.clone())
        };

        let ingestion = self.ingestor.run(generation, &periods, &config).await;

        let mut inner = self.inner.lock().await;
        if !self.ingestor.is_current(ingestion.generation) {
            debug!(
                "Discarding ingestion #{}, a later refresh is running",
                ingestion.generation
            );
            return RefreshOutcome::Superseded {
                generation: ingestion.generation,
            };
        }
        for (period, transactions) in ingestion.periods {
            inner.ledger.replace_fetched(period, transactions);
        }
        self.persist(StateKey::FetchedCache, inner.ledger.fetched())
            .await;
        inner.state = inner.state.next(StateEvent::RefreshCompleted);
        RefreshOutcome::Committed {
            generation: ingestion.generation,
            failures: ingestion.failures,
        }
    }

    pub async fn upsert_manual(&self, tx: Transaction) -> Result<PeriodKey, ManualEntryError> {
        let mut inner = self.inner.lock().await;
        let period = inner.ledger.upsert_manual(tx)?;
        self.persist(StateKey::ManualTransactions, inner.ledger.manual())
            .await;
        Ok(period)
    }

    pub async fn remove_manual(&self, id: &str) -> Option<PeriodKey> {
        let mut inner = self.inner.lock().await;
        let period = inner.ledger.remove_manual(id)?;
        self.persist(StateKey::ManualTransactions, inner.ledger.manual())
            .await;
        Some(period)
    }

    pub async fn manual_entry(&self, id: &str) -> Option<Transaction> {
        self.inner.lock().await.ledger.manual_entry(id).cloned()
    }

    /// Flips whether `id` is ignored and returns the new membership.
    pub async fn toggle_ignore(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let ignored = inner.ledger.toggle_ignore(id);
        self.persist(StateKey::IgnoredIds, inner.ledger.ignored())
            .await;
        ignored
    }

    pub async fn merged(&self) -> Vec<Transaction> {
        let inner = self.inner.lock().await;
        inner.ledger.merged(&inner.selected)
    }

    pub async fn active(&self) -> Vec<Transaction> {
        let inner = self.inner.lock().await;
        inner.ledger.active(&inner.selected)
    }

    pub async fn chronological(&self) -> Vec<Transaction> {
        let inner = self.inner.lock().await;
        inner.ledger.chronological(&inner.selected)
    }

    pub async fn summary(&self) -> Summary {
        analytics::summarize(&self.active().await)
    }

    pub async fn window_report(&self, window: TimeWindow, today: NaiveDate) -> WindowReport {
        analytics::window_report(&self.active().await, window, today, &self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{DEFAULT_CATEGORY, MANUAL_SOURCE, TransactionType};
    use crate::store::MemoryStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MockFeedProvider {
        feeds: HashMap<String, String>,
        delays: HashMap<String, u64>,
    }

    #[async_trait]
    impl FeedProvider for MockFeedProvider {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            if let Some(ms) = self.delays.get(url) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.feeds
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("No feed at {}", url))
        }
    }

    fn provider() -> MockFeedProvider {
        MockFeedProvider {
            feeds: [
                ("http://feeds/jan", "Data,Valor,Descricao\n05/01/2024,100,Venda jan\n"),
                ("http://feeds/feb", "Data,Valor,Descricao\n05/02/2024,100,Venda fev\n"),
            ]
            .iter()
            .map(|(u, f)| (u.to_string(), f.to_string()))
            .collect(),
            delays: HashMap::new(),
        }
    }

    fn period(key: &str) -> PeriodKey {
        key.parse().unwrap()
    }

    fn manual_tx(id: &str, date: &str, amount: Decimal) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: date.to_string(),
            description: format!("manual {id}"),
            amount,
            category: DEFAULT_CATEGORY.to_string(),
            kind: TransactionType::from_amount(amount),
            source: MANUAL_SOURCE.to_string(),
            manual_source_label: None,
        }
    }

    async fn two_month_session(store: Arc<MemoryStore>) -> Session<MockFeedProvider> {
        let session = Session::load(store, provider(), SourceCatalog::default()).await;
        session
            .set_source_url(period("2024-01"), "nubank_pf_pix", "http://feeds/jan")
            .await;
        session
            .set_source_url(period("2024-02"), "nubank_pf_pix", "http://feeds/feb")
            .await;
        session
            .upsert_manual(manual_tx("m1", "10/01/2024", dec!(-40)))
            .await
            .unwrap();
        session
            .upsert_manual(manual_tx("m2", "10/02/2024", dec!(-40)))
            .await
            .unwrap();
        let outcome = session
            .select_periods(vec![period("2024-01"), period("2024-02")])
            .await;
        assert!(matches!(outcome, RefreshOutcome::Committed { .. }));
        session
    }

    #[test]
    fn test_state_transitions() {
        use AppState::*;
        use StateEvent::*;
        assert_eq!(Empty.next(PeriodsSelected), Loading);
        assert_eq!(Loading.next(RefreshCompleted), Ready);
        assert_eq!(Ready.next(RefreshStarted), Loading);
        assert_eq!(Ready.next(PeriodsSelected), Ready);
        assert_eq!(Ready.next(RefreshCompleted), Ready);
        for state in [Empty, Loading, Ready] {
            assert_eq!(state.next(PeriodsCleared), Empty);
        }
    }

    #[tokio::test]
    async fn test_two_periods_summary() {
        let session = two_month_session(Arc::new(MemoryStore::new())).await;

        assert_eq!(session.state().await, AppState::Ready);
        assert_eq!(session.active().await.len(), 4);
        let summary = session.summary().await;
        assert_eq!(summary.income_total, dec!(200));
        assert_eq!(summary.expenses_total, dec!(80));
        assert_eq!(summary.balance, dec!(120));
    }

    #[tokio::test]
    async fn test_ignore_toggle_round_trip() {
        let session = two_month_session(Arc::new(MemoryStore::new())).await;
        let original = session.summary().await;
        let fetched_id = session
            .merged()
            .await
            .into_iter()
            .find(|t| !t.is_manual())
            .unwrap()
            .id;

        assert!(session.toggle_ignore(&fetched_id).await);
        assert_eq!(session.active().await.len(), 3);
        assert!(session.active().await.iter().all(|t| t.id != fetched_id));
        assert_eq!(session.summary().await.income_total, dec!(100));
        assert_eq!(session.merged().await.len(), 4);

        assert!(!session.toggle_ignore(&fetched_id).await);
        assert_eq!(session.summary().await, original);
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        let session = two_month_session(store.clone()).await;
        session.toggle_ignore("m1").await;

        let reloaded = Session::load(store, provider(), SourceCatalog::default()).await;
        assert_eq!(reloaded.state().await, AppState::Ready);
        assert_eq!(
            reloaded.selected_periods().await,
            session.selected_periods().await
        );
        assert_eq!(reloaded.source_config().await, session.source_config().await);
        assert_eq!(reloaded.ignored_ids().await, session.ignored_ids().await);
        assert_eq!(reloaded.merged().await, session.merged().await);
        assert_eq!(reloaded.summary().await, session.summary().await);
    }

    #[tokio::test]
    async fn test_clearing_selection_empties_state() {
        let session = two_month_session(Arc::new(MemoryStore::new())).await;
        let outcome = session.select_periods(Vec::new()).await;
        assert_eq!(outcome, RefreshOutcome::NothingSelected);
        assert_eq!(session.state().await, AppState::Empty);
        assert!(session.active().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_manual_date_is_reported() {
        let session = Session::load(
            Arc::new(MemoryStore::new()),
            provider(),
            SourceCatalog::default(),
        )
        .await;
        let result = session
            .upsert_manual(manual_tx("bad", "10-01-2024", dec!(-1)))
            .await;
        assert!(matches!(result, Err(ManualEntryError::InvalidDate(_))));
        assert!(session.manual_entry("bad").await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_period_cache() {
        let session = two_month_session(Arc::new(MemoryStore::new())).await;
        session
            .set_source_url(period("2024-01"), "nubank_pf_pix", "http://feeds/missing")
            .await;

        let descriptions: Vec<String> = session
            .merged()
            .await
            .into_iter()
            .map(|t| t.description)
            .collect();
        assert_eq!(descriptions, vec!["manual m1", "Venda fev", "manual m2"]);
    }

    #[tokio::test]
    async fn test_duplicate_selection_is_collapsed() {
        let session = Session::load(
            Arc::new(MemoryStore::new()),
            provider(),
            SourceCatalog::default(),
        )
        .await;
        session
            .select_periods(vec![period("2024-02"), period("2024-01"), period("2024-02")])
            .await;
        assert_eq!(
            session.selected_periods().await,
            vec![period("2024-02"), period("2024-01")]
        );
    }

    #[tokio::test]
    async fn test_overlapping_refresh_keeps_latest_result() {
        let mut provider = provider();
        provider.feeds.insert(
            "http://feeds/slow".to_string(),
            "05/01/2024,1,slow\n".to_string(),
        );
        provider.feeds.insert(
            "http://feeds/fast".to_string(),
            "05/01/2024,2,fast\n".to_string(),
        );
        provider.delays.insert("http://feeds/slow".to_string(), 50);
        let session =
            Session::load(Arc::new(MemoryStore::new()), provider, SourceCatalog::default()).await;
        session
            .set_source_url(period("2024-01"), "nubank_pf_pix", "http://feeds/slow")
            .await;
        session.select_periods(vec![period("2024-01")]).await;

        let (first, second) = tokio::join!(session.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session
                .set_source_url(period("2024-01"), "nubank_pf_pix", "http://feeds/fast")
                .await
        });

        assert!(matches!(first, RefreshOutcome::Superseded { .. }));
        assert!(matches!(second, RefreshOutcome::Committed { .. }));
        let descriptions: Vec<String> = session
            .merged()
            .await
            .into_iter()
            .map(|t| t.description)
            .collect();
        assert_eq!(descriptions, vec!["fast"]);
        assert_eq!(session.state().await, AppState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_source_edits_are_both_kept() {
        let session = Session::load(
            Arc::new(MemoryStore::new()),
            provider(),
            SourceCatalog::default(),
        )
        .await;
        tokio::join!(
            session.set_source_url(period("2024-01"), "nubank_pf_pix", "http://feeds/jan"),
            session.set_source_url(period("2024-01"), "nubank_cc", "http://feeds/feb"),
        );

        let config = session.source_config().await;
        let urls = &config[&period("2024-01")];
        assert_eq!(urls.len(), 2);
        assert_eq!(urls["nubank_pf_pix"], "http://feeds/jan");
        assert_eq!(urls["nubank_cc"], "http://feeds/feb");
    }
}
