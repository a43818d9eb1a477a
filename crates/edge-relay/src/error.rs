//! Relay error types.

use thiserror::Error;

/// Relay error type. Logged by the relay, never fatal to it.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Command store error
    #[error("Store error: {0}")]
    Store(#[from] command_store::StoreError),

    /// Persisted relay state error
    #[error("State error: {0}")]
    State(#[from] edge_state_storage::StorageError),

    /// Opening the live subscription failed
    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Result type alias using RelayError.
pub type RelayResult<T> = Result<T, RelayError>;
