use crate::core::persist::{StateKey, StateStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const STATE_PARTITION: &str = "state";

/// State store backed by a fjall keyspace on disk. Each entry is one key of the
/// `state` partition and every write is synced before returning.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path.join("keyspace"))
            .open()
            .with_context(|| format!("Failed to open keyspace in {}", path.display()))?;
        let partition = keyspace
            .open_partition(STATE_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open state partition")?;
        debug!("Opened state store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

#[async_trait]
impl StateStore for DiskStore {
    async fn get(&self, key: StateKey) -> Result<Option<Vec<u8>>> {
        let value = self
            .partition
            .get(key.as_str())
            .with_context(|| format!("Failed to read {key}"))?;
        if value.is_some() {
            debug!("Store HIT for {key}");
        } else {
            debug!("Store MISS for {key}");
        }
        Ok(value.map(|slice| slice.to_vec()))
    }

    async fn put(&self, key: StateKey, value: Vec<u8>) -> Result<()> {
        self.partition
            .insert(key.as_str(), value)
            .with_context(|| format!("Failed to write {key}"))?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to sync state store")?;
        debug!("Store PUT for {key}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_store_get_put() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        assert!(store.get(StateKey::SourceConfigs).await.unwrap().is_none());

        store
            .put(StateKey::SourceConfigs, b"{}".to_vec())
            .await
            .unwrap();
        assert_eq!(
            store.get(StateKey::SourceConfigs).await.unwrap(),
            Some(b"{}".to_vec())
        );

        store
            .put(StateKey::SourceConfigs, b"{\"a\":1}".to_vec())
            .await
            .unwrap();
        assert_eq!(
            store.get(StateKey::SourceConfigs).await.unwrap(),
            Some(b"{\"a\":1}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = DiskStore::open(dir.path()).unwrap();
            store
                .put(StateKey::IgnoredIds, b"[\"x\"]".to_vec())
                .await
                .unwrap();
        }

        let reopened = DiskStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get(StateKey::IgnoredIds).await.unwrap(),
            Some(b"[\"x\"]".to_vec())
        );
        assert!(reopened.get(StateKey::FetchedCache).await.unwrap().is_none());
    }
}
