//! Async SQLite executor using a dedicated background thread.
//!
//! All SQL runs on a single thread owned by `tokio_rusqlite`. Callers send
//! closures through `call()` and await the result without blocking the
//! Tokio runtime. Writes are serialized in FIFO order, which is what makes
//! each append atomic with respect to concurrent submitters.
//!
//! Only SQL and lightweight row mapping belong inside `call()`.

use crate::{migrations, CommandId, StoreError, StoreResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_rusqlite::Connection;
use tracing::info;

/// Default re-evaluation period for live queries.
pub const DEFAULT_LIVE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Convert a tokio_rusqlite::Error to StoreError.
fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> StoreError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => StoreError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => StoreError::Connection("Connection closed".to_string()),
        other => StoreError::Connection(other.to_string()),
    }
}

/// Durable command log backed by SQLite with a dedicated executor thread.
///
/// Cloning is cheap; clones share the connection, the id generator and the
/// change hub that drives live queries.
#[derive(Clone)]
pub struct CommandStore {
    conn: Connection,
    /// Bumped after every committed write made through this store.
    changes: Arc<watch::Sender<u64>>,
    ids: Arc<Mutex<ulid::Generator>>,
    live_poll_interval: Duration,
}

impl CommandStore {
    /// Open a store at the given path.
    ///
    /// Creates the file and parent directory if missing, enables WAL mode
    /// and runs pending migrations.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "Opening command store");

        let conn = Connection::open(&path_str)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        let store = Self::from_connection(conn).await?;
        info!(path = %path_str, "Command store initialized with WAL mode");
        Ok(store)
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.call(|conn| Ok(migrations::run_migrations(conn)))
            .await
            .map_err(from_tokio_rusqlite)??;

        let (changes, _) = watch::channel(0u64);
        Ok(Self {
            conn,
            changes: Arc::new(changes),
            ids: Arc::new(Mutex::new(ulid::Generator::new())),
            live_poll_interval: DEFAULT_LIVE_POLL_INTERVAL,
        })
    }

    /// Override how often live queries re-evaluate without a local write.
    ///
    /// The poll picks up writes made by other processes sharing the file.
    pub fn with_live_poll_interval(mut self, interval: Duration) -> Self {
        self.live_poll_interval = interval;
        self
    }

    pub fn live_poll_interval(&self) -> Duration {
        self.live_poll_interval
    }

    /// Execute a closure on the database connection.
    ///
    /// The closure runs on the dedicated SQLite thread; keep it to SQL.
    pub async fn call<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let outer_result = self
            .conn
            .call(move |conn| {
                let inner_result = f(conn);
                Ok(inner_result)
            })
            .await;

        match outer_result {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Generate the next command id.
    pub(crate) fn next_command_id(&self) -> StoreResult<CommandId> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| StoreError::InvalidData("id generator lock poisoned".to_string()))?;
        let ulid = ids
            .generate()
            .map_err(|e| StoreError::InvalidData(format!("id generation failed: {e}")))?;
        Ok(CommandId::from_string(ulid.to_string()))
    }

    /// Signal live queries that a write has committed.
    pub(crate) fn notify_changed(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    pub(crate) fn watch_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_on_disk_runs_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("commands.sqlite");

        let store = CommandStore::open(&db_path).await.unwrap();

        let tables: Vec<String> = store
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'commands') ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["commands", "users"]);
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("commands.sqlite");
        {
            let conn = rusqlite::Connection::open(&db_path).unwrap();
            migrations::run_migrations(&conn).unwrap();
            conn.execute(
                "INSERT INTO migrations (version, name) VALUES (?1, 'future')",
                [migrations::CURRENT_VERSION + 1],
            )
            .unwrap();
        }

        let result = CommandStore::open(&db_path).await;
        assert!(matches!(result, Err(StoreError::Migration(_))));
    }

    #[tokio::test]
    async fn test_command_ids_are_monotonic() {
        let store = CommandStore::open_in_memory().await.unwrap();
        let first = store.next_command_id().unwrap();
        let second = store.next_command_id().unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_notify_bumps_change_version() {
        let store = CommandStore::open_in_memory().await.unwrap();
        let mut changes = store.watch_changes();
        store.notify_changed();
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);
        assert!(!changes.has_changed().unwrap());
    }
}
