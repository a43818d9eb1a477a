//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::{StoreError, StoreResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current_version, CURRENT_VERSION
        )));
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_users(conn)?;
    }
    if current_version < 2 {
        migrate_v2_commands(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: users keyed by email.
fn migrate_v1_users(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v1: users");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            role TEXT NOT NULL DEFAULT 'restricted',
            created_at INTEGER NOT NULL
        );
        ",
    )?;

    record_migration(conn, 1, "users")?;
    Ok(())
}

/// V2: append-only command log.
///
/// `seq` preserves insertion order and breaks ties on equal `created_at`.
fn migrate_v2_commands(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v2: commands");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS commands (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            type TEXT NOT NULL,
            amount REAL,
            submitter_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            acknowledged INTEGER NOT NULL DEFAULT 0,
            acknowledged_at INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_commands_created_at
            ON commands(created_at, seq);
        CREATE INDEX IF NOT EXISTS idx_commands_unacknowledged
            ON commands(created_at, seq) WHERE acknowledged = 0;
        ",
    )?;

    record_migration(conn, 2, "commands")?;
    Ok(())
}
