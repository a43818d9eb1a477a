//! Store model types.

use playback_protocol_types::{CommandType, FrameRequest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, globally unique command identifier.
///
/// Ids are ULIDs from a monotonic generator, so lexical order follows
/// creation order within one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access level of a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Auto-provisioned, not yet approved. Cannot submit commands.
    Restricted,
    User,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Restricted
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse a stored role. Anything unrecognised (including the legacy
    /// `blocked` name) maps to `Restricted`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "user" => Self::User,
            "admin" => Self::Admin,
            _ => Self::Restricted,
        }
    }

    pub fn can_submit(&self) -> bool {
        !matches!(self, Self::Restricted)
    }
}

/// User record, one per email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Input for provisioning a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub created_at: i64,
}

/// A playback command in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub command_type: CommandType,
    /// Seconds for seeks, rate delta for speed changes.
    pub amount: Option<f64>,
    pub submitter_id: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub acknowledged: bool,
    pub acknowledged_at: Option<i64>,
}

impl Command {
    /// The message a relay forwards into rendering contexts.
    pub fn to_frame_request(&self) -> FrameRequest {
        FrameRequest::new(self.command_type, self.amount)
    }

    /// Age in milliseconds relative to `now_ms`. Never negative.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.created_at).max(0)
    }
}

/// Input for appending a command.
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub command_type: CommandType,
    pub amount: Option<f64>,
    pub submitter_id: String,
    pub created_at: i64,
}

/// Outcome of an acknowledge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The command transitioned to acknowledged.
    Acknowledged,
    /// The command was already acknowledged; nothing changed.
    AlreadyAcknowledged,
}
