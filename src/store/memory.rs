//! In-memory key-value store for tests and ephemeral sessions

use super::{KeyValueStore, StoreError, StoreOp, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw value, bypassing serialization
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn apply(&self, ops: &[StoreOp]) -> StoreResult<()> {
        // Single lock for the whole batch keeps it atomic
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for op in ops {
            match op {
                StoreOp::Put { key, value } => {
                    entries.insert((*key).to_string(), value.clone());
                }
                StoreOp::Remove { key } => {
                    entries.remove(*key);
                }
            }
        }
        Ok(())
    }
}
