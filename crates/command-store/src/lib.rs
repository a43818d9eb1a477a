//! SQLite command log for the playback relay.
//!
//! This crate provides:
//! - `CommandStore`: async SQLite executor with a dedicated thread
//! - Database migrations for users and commands
//! - Append-only command log with acknowledge and recent queries
//! - User records keyed by email, auto-provisioned as restricted
//! - A live query yielding the latest unacknowledged command
//!
//! ```ignore
//! let store = CommandStore::open(path).await?;
//! let mut live = store.subscribe_latest_unacknowledged();
//! while let Some(latest) = live.recv().await {
//!     // latest: Option<Command>, delivered at least once per change
//! }
//! ```

mod commands;
mod error;
mod executor;
pub mod live;
mod migrations;
mod models;
pub mod queries;
mod users;

pub use error::{StoreError, StoreResult};
pub use executor::{CommandStore, DEFAULT_LIVE_POLL_INTERVAL};
pub use live::{LatestUnacknowledged, LiveSubscription};
pub use migrations::run_migrations;
pub use models::*;
pub use queries::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
