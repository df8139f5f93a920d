//! Persisted state entries and the storage abstraction behind them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Display;
use tracing::{debug, warn};

/// The independently persisted entries of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    SelectedPeriods,
    SourceConfigs,
    ManualTransactions,
    IgnoredIds,
    FetchedCache,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::SelectedPeriods => "selected_periods",
            StateKey::SourceConfigs => "source_configs",
            StateKey::ManualTransactions => "manual_transactions",
            StateKey::IgnoredIds => "ignored_ids",
            StateKey::FetchedCache => "fetched_cache",
        }
    }
}

impl Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte storage for state entries. Every write replaces the whole entry.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: StateKey) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: StateKey, value: Vec<u8>) -> Result<()>;
}

/// Reads an entry, degrading to the default when it is missing or unreadable.
pub async fn load_entry<T>(store: &dyn StateStore, key: StateKey) -> T
where
    T: DeserializeOwned + Default,
{
    let bytes = match store.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!("No stored value for {key}, using default");
            return T::default();
        }
        Err(e) => {
            warn!(error = %e, "Failed to read {key}, using default");
            return T::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Stored value for {key} is malformed, using default");
            T::default()
        }
    }
}

/// Serializes and writes a whole entry.
pub async fn save_entry<T>(store: &dyn StateStore, key: StateKey, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value).with_context(|| format!("Failed to serialize {key}"))?;
    store
        .put(key, bytes)
        .await
        .with_context(|| format!("Failed to write {key}"))?;
    debug!("Persisted {key}");
    Ok(())
}
