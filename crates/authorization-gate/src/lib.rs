//! Authorization gate for command submission.
//!
//! Every submission resolves the caller's identity to a user record by
//! email. Unknown emails are provisioned as `restricted`, and restricted
//! users are refused. Roles are only ever changed by an administrator.

mod error;

pub use error::{GateError, GateResult};

use command_store::{now_millis, CommandId, CommandStore, NewCommand, NewUser, User};
use playback_protocol_types::CommandType;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A verified principal as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable provider subject id, recorded as the command's submitter.
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: Some(email.into()),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn email_claim(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Resolves identities to users and gates command submission.
#[derive(Clone)]
pub struct AuthorizationGate {
    store: CommandStore,
}

impl AuthorizationGate {
    pub fn new(store: CommandStore) -> Self {
        Self { store }
    }

    /// Submit a command on behalf of `identity`.
    ///
    /// Fails with `Unauthenticated` when there is no identity or it has no
    /// email claim; nothing is written in that case. Fails with `Forbidden`
    /// when the user is restricted, after the user record was provisioned.
    pub async fn submit(
        &self,
        identity: Option<&Identity>,
        command_type: CommandType,
        amount: Option<f64>,
    ) -> GateResult<CommandId> {
        let (identity, email) = authenticated(identity)?;

        if let Some(value) = amount {
            if !value.is_finite() {
                return Err(GateError::InvalidAmount(value));
            }
        }

        let user = self.resolve_user(identity, email).await?;
        if !user.role.can_submit() {
            warn!(email = %user.email, command_type = %command_type, "Submission refused for restricted user");
            return Err(GateError::Forbidden);
        }

        let id = self
            .store
            .append(NewCommand {
                command_type,
                amount,
                submitter_id: identity.subject.clone(),
                created_at: now_millis(),
            })
            .await?;

        info!(
            command_id = %id,
            command_type = %command_type,
            submitter = %identity.subject,
            "Command submitted"
        );
        Ok(id)
    }

    /// Session bootstrap: make sure a user record exists for `identity`.
    pub async fn ensure_user(&self, identity: Option<&Identity>) -> GateResult<User> {
        let (identity, email) = authenticated(identity)?;
        self.resolve_user(identity, email).await
    }

    /// Whether `email` belongs to a user allowed to submit commands.
    pub async fn is_authorized(&self, email: &str) -> GateResult<bool> {
        Ok(self
            .store
            .user_by_email(email)
            .await?
            .map(|user| user.role.can_submit())
            .unwrap_or(false))
    }

    /// Look up a user for display purposes.
    pub async fn user_by_email(&self, email: &str) -> GateResult<Option<User>> {
        Ok(self.store.user_by_email(email).await?)
    }

    async fn resolve_user(&self, identity: &Identity, email: &str) -> GateResult<User> {
        let (user, _created) = self
            .store
            .provision_user(NewUser {
                email: email.to_string(),
                name: identity.name.clone(),
                created_at: now_millis(),
            })
            .await?;
        Ok(user)
    }
}

fn authenticated(identity: Option<&Identity>) -> GateResult<(&Identity, &str)> {
    let identity = identity.ok_or(GateError::Unauthenticated)?;
    let email = identity.email_claim().ok_or(GateError::Unauthenticated)?;
    Ok((identity, email))
}
