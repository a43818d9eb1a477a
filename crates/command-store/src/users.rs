//! User record operations.

use crate::queries;
use crate::{CommandStore, NewUser, StoreError, StoreResult, User, UserRole};
use tracing::info;

impl CommandStore {
    /// Get a user by email.
    pub async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_string();
        self.call(move |conn| queries::get_user_by_email(conn, &email))
            .await
    }

    /// Return the user for `new.email`, creating a restricted record first if
    /// none exists. Never changes the role of an existing user.
    ///
    /// Returns the user and whether it was created by this call.
    pub async fn provision_user(&self, new: NewUser) -> StoreResult<(User, bool)> {
        let email = new.email.clone();
        let (user, created) = self
            .call(move |conn| {
                let created = queries::insert_user_if_absent(conn, &new)?;
                let user = queries::get_user_by_email(conn, &new.email)?.ok_or_else(|| {
                    StoreError::NotFound(format!("user {} after insert", new.email))
                })?;
                Ok((user, created))
            })
            .await?;

        if created {
            info!(email = %email, "Auto-provisioned restricted user");
        }
        Ok((user, created))
    }

    /// Administrative role change. Returns false if the email is unknown.
    pub async fn set_user_role(&self, email: &str, role: UserRole) -> StoreResult<bool> {
        let target = email.to_string();
        let updated = self
            .call(move |conn| queries::set_user_role(conn, &target, role))
            .await?;
        if updated {
            info!(email = %email, role = role.as_str(), "User role changed");
        }
        Ok(updated)
    }
}
