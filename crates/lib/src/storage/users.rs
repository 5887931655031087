//! User account operations.
//!
//! The engine only needs users for scoping, but something has to register
//! them; these are the operations the identity layer uses.

use tracing::{debug, info};

use super::{Storage, StorageError};
use crate::Result;
use crate::entity::{NewUser, User};

impl Storage {
    /// Register a user. A taken username is a conflict error.
    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        if user.username.is_empty() {
            return Err(StorageError::MissingUsername.into());
        }
        let created = self.inner.backend.create_user(user).await?;
        info!(username = %created.username, id = %created.id, "Created user");
        Ok(created)
    }

    /// Look a user up by username.
    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.inner.backend.find_user(username).await
    }

    /// All users ordered by username.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.backend.list_users().await
    }

    pub async fn update_password(&self, username: &str, password: &str) -> Result<()> {
        debug!(username, "Updating password");
        self.inner.backend.update_password(username, password).await
    }

    pub async fn update_email(&self, username: &str, email: &str) -> Result<()> {
        debug!(username, "Updating email");
        self.inner.backend.update_email(username, email).await
    }

    /// Delete a user together with all of their collections and objects.
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        self.inner.backend.delete_user(username).await?;
        info!(username, "Deleted user");
        Ok(())
    }
}
