//! Pure protocol types shared by every playback relay component.
//!
//! This crate carries:
//! - `CommandType`: the six playback operations an operator can submit
//! - `FrameRequest`: the message a relay sends into a rendering context
//! - `ExecutionResult`: the structured reply a rendering context sends back
//!
//! The wire format is camelCase JSON, matching what the extension side
//! of the protocol speaks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A playback operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandType {
    Play,
    Pause,
    SeekForward,
    SeekBackward,
    SpeedUp,
    SpeedDown,
}

impl CommandType {
    /// All command types, in submission-form order.
    pub const ALL: [CommandType; 6] = [
        Self::Play,
        Self::Pause,
        Self::SeekForward,
        Self::SeekBackward,
        Self::SpeedUp,
        Self::SpeedDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::SeekForward => "seekForward",
            Self::SeekBackward => "seekBackward",
            Self::SpeedUp => "speedUp",
            Self::SpeedDown => "speedDown",
        }
    }

    /// Whether `amount` is a seek distance in seconds.
    pub fn is_seek(&self) -> bool {
        matches!(self, Self::SeekForward | Self::SeekBackward)
    }

    /// Whether `amount` is a playback-rate delta.
    pub fn is_speed(&self) -> bool {
        matches!(self, Self::SpeedUp | Self::SpeedDown)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known command type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command type: {0}")]
pub struct UnknownCommandType(pub String);

impl FromStr for CommandType {
    type Err = UnknownCommandType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownCommandType(s.to_string()))
    }
}

/// Request delivered from the relay into a rendering context.
///
/// `command_type` stays a plain string on the wire so that a context can
/// report an unknown type as a structured failure instead of failing to
/// decode the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRequest {
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl FrameRequest {
    pub fn new(command_type: CommandType, amount: Option<f64>) -> Self {
        Self {
            command_type: command_type.as_str().to_string(),
            amount,
        }
    }

    /// Parse the command type carried by this request.
    pub fn parsed_type(&self) -> Result<CommandType, UnknownCommandType> {
        self.command_type.parse()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Structured reply from a rendering context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
