use crate::core::persist::{StateKey, StateStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory state store, lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<StateKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: StateKey) -> Result<Option<Vec<u8>>> {
        let entries = self.inner.lock().await;
        let value = entries.get(&key).cloned();
        if value.is_some() {
            debug!("Store HIT for {key}");
        } else {
            debug!("Store MISS for {key}");
        }
        Ok(value)
    }

    async fn put(&self, key: StateKey, value: Vec<u8>) -> Result<()> {
        let mut entries = self.inner.lock().await;
        debug!("Store PUT for {key}");
        entries.insert(key, value);
        Ok(())
    }
}
