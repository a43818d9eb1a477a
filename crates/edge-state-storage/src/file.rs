//! JSON file backend.

use crate::{StateStorage, StorageError, StorageResult};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Stores all keys as one JSON object in a single file.
///
/// Every write replaces the file atomically (temp file, fsync, rename), so a
/// restart observes either the previous or the new state, never a torn one.
/// The file is created on the first write.
pub struct FileStateStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Map<String, Value>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice(&bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::Encoding(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                type_name(&other)
            ))),
        }
    }

    fn store(&self, map: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(map)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut Map<String, Value>) -> T) -> StorageResult<T> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.load()?;
        let out = f(&mut map);
        self.store(&map)?;
        Ok(out)
    }
}

impl StateStorage for FileStateStorage {
    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        debug!(path = %self.path.display(), key = %key, "Setting state");
        self.update(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        self.update(|map| map.remove(key).is_some())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(dir.path().join("relay-state.json"));

        assert_eq!(storage.get("anything").unwrap(), None);
        assert!(!storage.path().exists());
    }

    #[test]
    fn values_survive_a_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("relay-state.json");

        let storage = FileStateStorage::new(&path);
        storage.set("lastDeliveredCommandId", json!("c1")).unwrap();
        storage.set("connected", json!(true)).unwrap();
        drop(storage);

        let reopened = FileStateStorage::new(&path);
        assert_eq!(reopened.get("lastDeliveredCommandId").unwrap(), Some(json!("c1")));
        assert_eq!(reopened.get("connected").unwrap(), Some(json!(true)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn delete_reports_presence() {
        let dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(dir.path().join("state.json"));

        storage.set("k", json!(1)).unwrap();
        assert!(storage.delete("k").unwrap());
        assert!(!storage.delete("k").unwrap());
        assert!(!storage.has("k").unwrap());
    }

    #[test]
    fn non_object_file_is_an_encoding_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2]").unwrap();

        let storage = FileStateStorage::new(&path);
        assert!(matches!(storage.get("k"), Err(StorageError::Encoding(_))));
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileStateStorage::new(&path);
        assert!(matches!(storage.get("k"), Err(StorageError::Json(_))));
    }
}
