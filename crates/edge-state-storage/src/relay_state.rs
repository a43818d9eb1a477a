//! Typed accessors over the relay's persisted state.

use crate::{FileStateStorage, MemoryStateStorage, StateStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Point-in-time copy of the relay state, shaped like the file on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStateSnapshot {
    pub last_delivered_command_id: Option<String>,
    pub connected: bool,
}

/// Edge-local state that survives relay restarts.
pub struct RelayState {
    storage: Box<dyn StateStorage>,
}

impl RelayState {
    /// Create relay state over the given backend
    pub fn new(storage: Box<dyn StateStorage>) -> Self {
        Self { storage }
    }

    /// File-backed state at `path`
    pub fn open(path: &Path) -> Self {
        Self::new(Box::new(FileStateStorage::new(path)))
    }

    /// Volatile state
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStateStorage::new()))
    }

    pub fn last_delivered_command_id(&self) -> StorageResult<Option<String>> {
        match self.storage.get(StorageKeys::LAST_DELIVERED_COMMAND_ID)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(id)) => Ok(Some(id)),
            Some(other) => Err(StorageError::Encoding(format!(
                "{} must be a string, found {}",
                StorageKeys::LAST_DELIVERED_COMMAND_ID,
                other
            ))),
        }
    }

    /// Durable once this returns.
    pub fn set_last_delivered_command_id(&self, id: Option<&str>) -> StorageResult<()> {
        let value = id.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null);
        self.storage.set(StorageKeys::LAST_DELIVERED_COMMAND_ID, value)
    }

    /// Missing means not connected.
    pub fn is_connected(&self) -> StorageResult<bool> {
        match self.storage.get(StorageKeys::CONNECTED)? {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(connected)) => Ok(connected),
            Some(other) => Err(StorageError::Encoding(format!(
                "{} must be a boolean, found {}",
                StorageKeys::CONNECTED,
                other
            ))),
        }
    }

    pub fn set_connected(&self, connected: bool) -> StorageResult<()> {
        self.storage.set(StorageKeys::CONNECTED, Value::Bool(connected))
    }

    pub fn snapshot(&self) -> StorageResult<RelayStateSnapshot> {
        Ok(RelayStateSnapshot {
            last_delivered_command_id: self.last_delivered_command_id()?,
            connected: self.is_connected()?,
        })
    }

    /// Forget everything.
    pub fn clear(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::LAST_DELIVERED_COMMAND_ID)?;
        self.storage.delete(StorageKeys::CONNECTED)?;
        Ok(())
    }
}
