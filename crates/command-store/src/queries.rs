//! Standalone query functions that work with any Connection.
//!
//! Each function takes a `&Connection` as its first parameter so it can run
//! inside `CommandStore::call()` on the executor thread.

use crate::{AckOutcome, Command, CommandId, NewCommand, NewUser, StoreError, StoreResult, User, UserRole};
use playback_protocol_types::CommandType;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

/// Default number of rows returned by `recent_commands`.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Upper bound accepted by `recent_commands`.
pub const MAX_RECENT_LIMIT: usize = 100;

const COMMAND_COLUMNS: &str =
    "id, type, amount, submitter_id, created_at, acknowledged, acknowledged_at";

// ==========================================
// Users
// ==========================================

/// Get a user by email.
pub fn get_user_by_email(conn: &Connection, email: &str) -> StoreResult<Option<User>> {
    let mut stmt = conn.prepare_cached(
        "SELECT email, name, role, created_at FROM users WHERE email = ?1",
    )?;

    let user = stmt
        .query_row(params![email], |row| {
            Ok(User {
                email: row.get(0)?,
                name: row.get(1)?,
                role: UserRole::from_str(&row.get::<_, String>(2)?),
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(user)
}

/// Insert a restricted user unless one already exists for the email.
///
/// Returns true if a row was created. Relies on the UNIQUE email constraint,
/// so concurrent provisioning of the same email creates exactly one row.
pub fn insert_user_if_absent(conn: &Connection, user: &NewUser) -> StoreResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO users (email, name, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            user.email,
            user.name,
            UserRole::Restricted.as_str(),
            user.created_at
        ],
    )?;
    if inserted > 0 {
        debug!(email = %user.email, "Provisioned restricted user");
    }
    Ok(inserted > 0)
}

/// Change a user's role. Returns false if no user has that email.
pub fn set_user_role(conn: &Connection, email: &str, role: UserRole) -> StoreResult<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE email = ?2",
        params![role.as_str(), email],
    )?;
    Ok(count > 0)
}

/// Count users with the given email (test and diagnostics helper).
pub fn count_users_with_email(conn: &Connection, email: &str) -> StoreResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ==========================================
// Commands
// ==========================================

/// Append a command with a pre-generated id.
pub fn insert_command(conn: &Connection, id: &CommandId, command: &NewCommand) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO commands (id, type, amount, submitter_id, created_at, acknowledged)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            id.as_str(),
            command.command_type.as_str(),
            command.amount,
            command.submitter_id,
            command.created_at,
        ],
    )?;
    Ok(())
}

/// Get a command by id.
pub fn get_command(conn: &Connection, id: &CommandId) -> StoreResult<Option<Command>> {
    let sql = format!("SELECT {COMMAND_COLUMNS} FROM commands WHERE id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    let command = stmt
        .query_row(params![id.as_str()], command_from_row)
        .optional()?;
    Ok(command)
}

/// The unacknowledged command with the greatest `created_at`; later
/// insertion wins a tie.
pub fn latest_unacknowledged(conn: &Connection) -> StoreResult<Option<Command>> {
    let sql = format!(
        "SELECT {COMMAND_COLUMNS} FROM commands
         WHERE acknowledged = 0
         ORDER BY created_at DESC, seq DESC
         LIMIT 1"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let command = stmt.query_row([], command_from_row).optional()?;
    Ok(command)
}

/// The `limit` most recent commands regardless of acknowledgment, newest first.
pub fn recent_commands(conn: &Connection, limit: usize) -> StoreResult<Vec<Command>> {
    let sql = format!(
        "SELECT {COMMAND_COLUMNS} FROM commands
         ORDER BY created_at DESC, seq DESC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let commands = stmt
        .query_map(params![limit as i64], command_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(commands)
}

/// Mark a command acknowledged.
///
/// Re-acknowledging is a no-op that keeps the first `acknowledged_at`.
pub fn acknowledge_command(
    conn: &Connection,
    id: &CommandId,
    acknowledged_at: i64,
) -> StoreResult<AckOutcome> {
    let updated = conn.execute(
        "UPDATE commands SET acknowledged = 1, acknowledged_at = ?1
         WHERE id = ?2 AND acknowledged = 0",
        params![acknowledged_at, id.as_str()],
    )?;
    if updated > 0 {
        return Ok(AckOutcome::Acknowledged);
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM commands WHERE id = ?1)",
        params![id.as_str()],
        |row| row.get(0),
    )?;
    if exists {
        Ok(AckOutcome::AlreadyAcknowledged)
    } else {
        Err(StoreError::NotFound(format!("command {id}")))
    }
}

fn command_from_row(row: &Row<'_>) -> rusqlite::Result<Command> {
    let raw_type: String = row.get(1)?;
    let command_type: CommandType = raw_type
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Command {
        id: CommandId::from_string(row.get::<_, String>(0)?),
        command_type,
        amount: row.get(2)?,
        submitter_id: row.get(3)?,
        created_at: row.get(4)?,
        acknowledged: row.get(5)?,
        acknowledged_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn new_command(command_type: CommandType, created_at: i64) -> NewCommand {
        NewCommand {
            command_type,
            amount: None,
            submitter_id: "user-1".to_string(),
            created_at,
        }
    }

    #[test]
    fn latest_unacknowledged_breaks_ties_by_insertion_order() {
        let conn = conn();
        insert_command(&conn, &CommandId::from_string("a"), &new_command(CommandType::Play, 10)).unwrap();
        insert_command(&conn, &CommandId::from_string("b"), &new_command(CommandType::Pause, 10)).unwrap();

        let latest = latest_unacknowledged(&conn).unwrap().unwrap();
        assert_eq!(latest.id.as_str(), "b");
    }

    #[test]
    fn acknowledge_unknown_command_is_not_found() {
        let conn = conn();
        let err = acknowledge_command(&conn, &CommandId::from_string("missing"), 1).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn insert_user_if_absent_is_unique_per_email() {
        let conn = conn();
        let user = NewUser {
            email: "a@example.com".to_string(),
            name: None,
            created_at: 1,
        };
        assert!(insert_user_if_absent(&conn, &user).unwrap());
        assert!(!insert_user_if_absent(&conn, &user).unwrap());
        assert_eq!(count_users_with_email(&conn, "a@example.com").unwrap(), 1);
    }

    #[test]
    fn corrupt_command_type_surfaces_as_error() {
        let conn = conn();
        conn.execute(
            "INSERT INTO commands (id, type, submitter_id, created_at) VALUES ('x', 'rewind', 'u', 1)",
            [],
        )
        .unwrap();
        assert!(latest_unacknowledged(&conn).is_err());
    }
}
