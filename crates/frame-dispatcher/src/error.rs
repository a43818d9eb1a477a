//! Dispatch error types.

use thiserror::Error;

/// Failure delivering a request to one frame. Logged, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Nothing in the frame is listening for requests
    #[error("No listener in frame")]
    NoListener,

    /// The context or frame went away before it answered
    #[error("Rendering context disconnected")]
    Disconnected,

    /// Any other host failure
    #[error("Host error: {0}")]
    Host(String),
}

/// Invalid target-site match pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Missing scheme separator in pattern: {0}")]
    MissingScheme(String),

    #[error("Unsupported scheme in pattern: {0}")]
    InvalidScheme(String),

    #[error("Invalid host in pattern: {0}")]
    InvalidHost(String),

    #[error("Missing path in pattern: {0}")]
    MissingPath(String),
}
