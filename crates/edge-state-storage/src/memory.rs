//! In-memory backend.

use crate::{StateStorage, StorageResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Volatile storage. Used in tests and for relays that need no restart safety.
#[derive(Default)]
pub struct MemoryStateStorage {
    data: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStateStorage {
    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        data.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let data = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(data.remove(key).is_some())
    }
}
