//! Storage trait definitions.

use crate::StorageResult;
use serde_json::Value;

/// Key-value backend for edge state.
///
/// Writes must be durable when `set` returns: the relay persists before it
/// forwards, and a restart may happen at any point afterwards.
pub trait StateStorage: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Delete a value
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
