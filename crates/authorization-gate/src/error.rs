//! Authorization gate error types.

use thiserror::Error;

/// Gate error type.
#[derive(Error, Debug)]
pub enum GateError {
    /// No verified identity, or the identity carries no email claim
    #[error("Not authenticated")]
    Unauthenticated,

    /// The user exists but is restricted
    #[error("Not authorized. Your account is pending approval.")]
    Forbidden,

    /// The command amount is NaN or infinite
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] command_store::StoreError),
}

/// Result type alias using GateError.
pub type GateResult<T> = Result<T, GateError>;
