//! Transaction store: fetched cache, manual entries and the ignored-id set, plus the
//! merged views built from them.

use crate::core::transaction::{PeriodKey, Transaction, TransactionType};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

pub type PeriodTransactions = BTreeMap<PeriodKey, Vec<Transaction>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManualEntryError {
    #[error("Invalid date '{0}', expected DD/MM/YYYY")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    fetched: PeriodTransactions,
    manual: PeriodTransactions,
    ignored: BTreeSet<String>,
}

impl Ledger {
    pub fn new(
        fetched: PeriodTransactions,
        manual: PeriodTransactions,
        ignored: BTreeSet<String>,
    ) -> Self {
        Self {
            fetched,
            manual,
            ignored,
        }
    }

    pub fn fetched(&self) -> &PeriodTransactions {
        &self.fetched
    }

    pub fn manual(&self) -> &PeriodTransactions {
        &self.manual
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    pub fn is_ignored(&self, id: &str) -> bool {
        self.ignored.contains(id)
    }

    /// Replaces the whole fetched list of `period`.
    pub fn replace_fetched(&mut self, period: PeriodKey, transactions: Vec<Transaction>) {
        debug!(
            "Replacing fetched cache of {} with {} transactions",
            period,
            transactions.len()
        );
        self.fetched.insert(period, transactions);
    }

    /// Adds or edits a manual transaction in the period its date falls in.
    ///
    /// An existing entry with the same id in that period is replaced in place;
    /// copies of it left in other periods (the date moved to another month) are
    /// removed. The type is re-derived from the amount sign.
    pub fn upsert_manual(&mut self, mut tx: Transaction) -> Result<PeriodKey, ManualEntryError> {
        let date = tx
            .calendar_date()
            .ok_or_else(|| ManualEntryError::InvalidDate(tx.date.clone()))?;
        let period = PeriodKey::from_date(date);
        tx.kind = TransactionType::from_amount(tx.amount);

        for (key, entries) in self.manual.iter_mut() {
            if *key != period {
                entries.retain(|t| t.id != tx.id);
            }
        }
        self.manual.retain(|_, entries| !entries.is_empty());

        let entries = self.manual.entry(period).or_default();
        match entries.iter_mut().find(|t| t.id == tx.id) {
            Some(existing) => {
                debug!("Replacing manual transaction {} in {}", tx.id, period);
                *existing = tx;
            }
            None => {
                debug!("Adding manual transaction {} to {}", tx.id, period);
                entries.push(tx);
            }
        }
        Ok(period)
    }

    /// Deletes a manual transaction, returning the period it was stored under.
    pub fn remove_manual(&mut self, id: &str) -> Option<PeriodKey> {
        let period = self
            .manual
            .iter()
            .find(|(_, entries)| entries.iter().any(|t| t.id == id))
            .map(|(key, _)| *key)?;
        if let Some(entries) = self.manual.get_mut(&period) {
            entries.retain(|t| t.id != id);
            if entries.is_empty() {
                self.manual.remove(&period);
            }
        }
        Some(period)
    }

    pub fn manual_entry(&self, id: &str) -> Option<&Transaction> {
        self.manual.values().flatten().find(|t| t.id == id)
    }

    /// Flips membership of `id` in the ignored set and returns the new membership.
    pub fn toggle_ignore(&mut self, id: &str) -> bool {
        if self.ignored.remove(id) {
            false
        } else {
            self.ignored.insert(id.to_string());
            true
        }
    }

    /// Fetched then manual transactions of each period, periods in the given order.
    pub fn merged(&self, periods: &[PeriodKey]) -> Vec<Transaction> {
        periods
            .iter()
            .flat_map(|period| {
                let fetched = self.fetched.get(period).into_iter().flatten();
                let manual = self.manual.get(period).into_iter().flatten();
                fetched.chain(manual)
            })
            .cloned()
            .collect()
    }

    /// The merged view without ignored transactions.
    pub fn active(&self, periods: &[PeriodKey]) -> Vec<Transaction> {
        let mut merged = self.merged(periods);
        merged.retain(|t| !self.ignored.contains(&t.id));
        merged
    }

    /// The merged view, newest first. Equal dates keep their merged order and
    /// unreadable dates go last.
    pub fn chronological(&self, periods: &[PeriodKey]) -> Vec<Transaction> {
        let mut merged = self.merged(periods);
        merged.sort_by_key(|t| std::cmp::Reverse(t.calendar_date()));
        merged
    }
}
