use dashmap::DashMap;

use super::{MonitorState, StateStore, StoreError};

/// In-process state backend
///
/// `DashMap` shards its entries, so files hashed to different shards never
/// contend, and writes to one key are serialized by its shard lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    states: DashMap<String, MonitorState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl StateStore for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<MonitorState>, StoreError> {
        Ok(self.states.get(key).map(|s| s.value().clone()))
    }

    fn set(&self, key: &str, state: &MonitorState) -> Result<(), StoreError> {
        self.states.insert(key.to_string(), state.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.states.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.states.iter().map(|e| e.key().clone()).collect())
    }

    fn name(&self) -> &str {
        "Memory"
    }
}
