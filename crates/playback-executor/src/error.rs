//! Execution error types.

use thiserror::Error;

/// Failure raised by a media target while a command is applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct MediaError {
    message: String,
}

impl MediaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Why a command could not be applied.
///
/// The display text is what travels back in `ExecutionResult.error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// No media element in this rendering context
    #[error("target not found")]
    TargetNotFound,

    /// The request named a command type this engine does not know
    #[error("unknown command type")]
    UnknownCommandType(String),

    /// The media target rejected an operation
    #[error("{0}")]
    Media(#[from] MediaError),
}

/// Result type alias using ExecutionError.
pub type EngineResult<T> = Result<T, ExecutionError>;
