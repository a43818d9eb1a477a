//! One-shot operator commands.

use super::{feedback, open_store};
use authorization_gate::{AuthorizationGate, GateError, Identity};
use chrono::{Local, TimeZone};
use command_store::{AckOutcome, Command, CommandId, CommandStore, UserRole};
use edge_state_storage::RelayState;
use playback_protocol_types::CommandType;
use relay_config_and_utils::{Config, Paths};
use tracing::info;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Build the submitting identity. The subject defaults to the email.
pub fn identity(email: String, subject: Option<String>, name: Option<String>) -> Identity {
    let subject = subject.unwrap_or_else(|| email.clone());
    let identity = Identity::new(subject, email);
    match name {
        Some(name) => identity.with_name(name),
        None => identity,
    }
}

pub async fn submit(
    config: &Config,
    paths: &Paths,
    identity: Identity,
    command_type: CommandType,
    amount: Option<f64>,
    follow: bool,
) -> CliResult<()> {
    let store = open_store(paths).await?;
    let id = match submit_command(&store, &identity, command_type, amount).await {
        Ok(id) => id,
        Err(GateError::Forbidden) => {
            println!("{}", GateError::Forbidden);
            println!(
                "Ask an administrator to run: playback-relay set-role {} user",
                identity.email.as_deref().unwrap_or_default()
            );
            return Err(GateError::Forbidden.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", id);
    if follow {
        feedback::follow_command(store, config.feedback_poll_interval(), &id).await?;
    }
    Ok(())
}

async fn submit_command(
    store: &CommandStore,
    identity: &Identity,
    command_type: CommandType,
    amount: Option<f64>,
) -> Result<CommandId, GateError> {
    AuthorizationGate::new(store.clone())
        .submit(Some(identity), command_type, amount)
        .await
}

pub async fn recent(paths: &Paths, limit: Option<usize>) -> CliResult<()> {
    let store = open_store(paths).await?;
    let commands = store.recent(limit).await?;
    if commands.is_empty() {
        println!("No commands");
        return Ok(());
    }
    for command in &commands {
        println!("{}", format_command(command));
    }
    Ok(())
}

fn format_command(command: &Command) -> String {
    let created = Local
        .timestamp_millis_opt(command.created_at)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| command.created_at.to_string());
    let amount = command
        .amount
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = if command.acknowledged { "executed" } else { "pending" };

    format!(
        "{}  {:<12} {:>6}  {}  {}  {}",
        command.id, command.command_type, amount, created, status, command.submitter_id
    )
}

pub async fn ack(paths: &Paths, id: &str) -> CliResult<()> {
    let store = open_store(paths).await?;
    let id = CommandId::from_string(id);
    match store.acknowledge(&id).await? {
        AckOutcome::Acknowledged => {
            info!(command_id = %id, "Command acknowledged by operator");
            println!("Acknowledged {}", id);
        }
        AckOutcome::AlreadyAcknowledged => println!("{} was already acknowledged", id),
    }
    Ok(())
}

pub async fn set_role(paths: &Paths, email: &str, role: UserRole) -> CliResult<()> {
    let store = open_store(paths).await?;
    if store.set_user_role(email, role).await? {
        println!("{} is now {}", email, role.as_str());
        Ok(())
    } else {
        Err(format!("No user with email {}", email).into())
    }
}

pub fn print_state(paths: &Paths) -> CliResult<()> {
    let snapshot = RelayState::open(&paths.relay_state_file()).snapshot()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identity_defaults_subject_to_email() {
        let identity = identity("a@example.com".to_string(), None, Some("A".to_string()));
        assert_eq!(identity.subject, "a@example.com");
        assert_eq!(identity.email.as_deref(), Some("a@example.com"));
        assert_eq!(identity.name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn submit_requires_approval_then_appends() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let store = open_store(&paths).await.unwrap();
        let operator = identity("op@example.com".to_string(), None, None);

        let refused = submit_command(&store, &operator, CommandType::Play, None).await;
        assert!(matches!(refused, Err(GateError::Forbidden)));

        set_role(&paths, "op@example.com", UserRole::User).await.unwrap();
        let id = submit_command(&store, &operator, CommandType::SeekForward, Some(10.0))
            .await
            .unwrap();

        let recent = store.recent(None).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
        assert!(format_command(&recent[0]).contains("seekForward"));
        assert!(format_command(&recent[0]).contains("pending"));
    }

    #[tokio::test]
    async fn set_role_for_unknown_email_fails() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        assert!(set_role(&paths, "ghost@example.com", UserRole::Admin).await.is_err());
    }

    #[tokio::test]
    async fn ack_unknown_id_fails() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        assert!(ack(&paths, "does-not-exist").await.is_err());
    }

    #[test]
    fn print_state_without_file_succeeds() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        assert!(print_state(&paths).is_ok());
    }
}
