//! Persisted edge state for the playback relay.
//!
//! The relay runs in a context that may be suspended and restarted at any
//! time. Whatever it must remember across restarts lives here:
//! - `StateStorage`: key-value backend trait
//! - `FileStateStorage`: JSON file with atomic replace
//! - `MemoryStateStorage`: volatile backend for tests
//! - `RelayState`: typed accessors for the relay's keys

mod file;
mod keys;
mod memory;
mod relay_state;
mod traits;

pub use file::FileStateStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStateStorage;
pub use relay_state::{RelayState, RelayStateSnapshot};
pub use traits::StateStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value has the wrong shape
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
