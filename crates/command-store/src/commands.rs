//! Command log operations.
//!
//! Append and acknowledge are the only writes. Every committed write bumps
//! the change hub so live queries re-evaluate.

use crate::queries::{self, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
use crate::{now_millis, AckOutcome, Command, CommandId, CommandStore, NewCommand, StoreResult};
use tracing::{debug, info};

impl CommandStore {
    /// Append a command and return its id.
    pub async fn append(&self, command: NewCommand) -> StoreResult<CommandId> {
        let id = self.next_command_id()?;
        let insert_id = id.clone();
        let command_type = command.command_type;

        self.call(move |conn| queries::insert_command(conn, &insert_id, &command))
            .await?;
        self.notify_changed();

        info!(command_id = %id, command_type = %command_type, "Command appended");
        Ok(id)
    }

    /// Get a command by id.
    pub async fn get_command(&self, id: &CommandId) -> StoreResult<Option<Command>> {
        let id = id.clone();
        self.call(move |conn| queries::get_command(conn, &id)).await
    }

    /// The most recent unacknowledged command, if any.
    pub async fn latest_unacknowledged(&self) -> StoreResult<Option<Command>> {
        self.call(queries::latest_unacknowledged).await
    }

    /// Mark a command acknowledged at the current time.
    ///
    /// Idempotent: acknowledging twice is a no-op. Unknown ids fail with
    /// `StoreError::NotFound`.
    pub async fn acknowledge(&self, id: &CommandId) -> StoreResult<AckOutcome> {
        let ack_id = id.clone();
        let now = now_millis();
        let outcome = self
            .call(move |conn| queries::acknowledge_command(conn, &ack_id, now))
            .await?;

        match outcome {
            AckOutcome::Acknowledged => {
                self.notify_changed();
                info!(command_id = %id, "Command acknowledged");
            }
            AckOutcome::AlreadyAcknowledged => {
                debug!(command_id = %id, "Command already acknowledged");
            }
        }
        Ok(outcome)
    }

    /// The most recent commands, newest first.
    ///
    /// `None` uses `DEFAULT_RECENT_LIMIT`; values are clamped to
    /// `1..=MAX_RECENT_LIMIT`.
    pub async fn recent(&self, limit: Option<usize>) -> StoreResult<Vec<Command>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        self.call(move |conn| queries::recent_commands(conn, limit))
            .await
    }
}
