use tracing::{debug, info};
use uuid::Uuid;
use validator::ValidateEmail;

use super::{DomainError, DomainResult, Lifecycle, Violations};
use crate::auth::password::{hash_password, validate_password_length};
use crate::models::role::{Role, RoleRecord};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::store::Page;

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,

    /// Plaintext; hashed before it reaches the store
    pub password: String,
    pub role: Role,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

/// Partial user update; `None` leaves the field alone
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

fn check_email(violations: &mut Violations, email: &str) {
    if !email.validate_email() {
        violations.push("email", "Invalid email format");
    }
}

fn check_password(violations: &mut Violations, password: &str) {
    if let Err(message) = validate_password_length(password) {
        violations.push("password", message);
    }
}

impl Lifecycle {
    /// Creates a user with the role given in `data`
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty name, malformed email or short password
    /// - `Store(Conflict)` when the email is already registered
    pub async fn create_user(&self, data: NewUser) -> DomainResult<User> {
        let email = data.email.trim().to_string();

        let mut violations = Violations::default();
        violations.require_text("name", &data.name);
        check_email(&mut violations, &email);
        check_password(&mut violations, &data.password);
        violations.finish()?;

        let password_hash = hash_password(&data.password)?;

        let user = self
            .store
            .create_user(CreateUser {
                name: data.name.trim().to_string(),
                email,
                password_hash,
                role: data.role,
                timezone: data.timezone,
                language: data.language,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "Created user");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> DomainResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    pub async fn list_users(&self, page: Page) -> DomainResult<Vec<User>> {
        Ok(self.store.list_users(page).await?)
    }

    pub async fn update_user(&self, id: Uuid, changes: UserChanges) -> DomainResult<User> {
        let mut violations = Violations::default();
        if let Some(name) = &changes.name {
            violations.require_text("name", name);
        }
        if let Some(email) = &changes.email {
            check_email(&mut violations, email.trim());
        }
        if let Some(password) = &changes.password {
            check_password(&mut violations, password);
        }
        violations.finish()?;

        let password_hash = changes
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        let update = UpdateUser {
            name: changes.name.map(|n| n.trim().to_string()),
            email: changes.email.map(|e| e.trim().to_string()),
            password_hash,
            role: changes.role,
            timezone: changes.timezone,
            language: changes.language,
        };

        let user = self
            .store
            .update_user(id, update)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;

        debug!(user_id = %id, "Updated user");
        Ok(user)
    }

    pub async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        if !self.store.delete_user(id).await? {
            return Err(DomainError::not_found("user", id));
        }

        info!(user_id = %id, "Deleted user");
        Ok(())
    }

    pub async fn list_roles(&self) -> DomainResult<Vec<RoleRecord>> {
        Ok(self.store.list_roles().await?)
    }

    /// Seeds an admin account unless the email is already registered
    ///
    /// Returns the new admin, or `None` when an account with that email
    /// exists (its role is left untouched).
    pub async fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<Option<User>> {
        if self.store.find_user_by_email(email.trim()).await?.is_some() {
            debug!(email = %email, "Bootstrap admin already present");
            return Ok(None);
        }

        let admin = self
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: Role::Admin,
                timezone: None,
                language: None,
            })
            .await?;

        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use std::sync::Arc;

    fn lifecycle() -> Lifecycle {
        Lifecycle::new(Arc::new(MemoryStore::new()))
    }

    fn jane() -> NewUser {
        NewUser {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct-horse".to_string(),
            role: Role::User,
            timezone: None,
            language: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let lifecycle = lifecycle();
        let user = lifecycle.create_user(jane()).await.unwrap();

        assert_eq!(user.role, Role::User);
        assert_eq!(user.timezone, "UTC");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_create_user_collects_violations() {
        let err = lifecycle()
            .create_user(NewUser {
                name: " ".to_string(),
                email: "not-an-email".to_string(),
                password: "short".to_string(),
                ..jane()
            })
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(list) => {
                let fields: Vec<_> = list.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let lifecycle = lifecycle();
        lifecycle.create_user(jane()).await.unwrap();

        let err = lifecycle
            .create_user(NewUser {
                email: "JANE@example.com".to_string(),
                ..jane()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Store(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_user() {
        let lifecycle = lifecycle();
        let missing = Uuid::new_v4();

        assert!(matches!(
            lifecycle.update_user(missing, UserChanges::default()).await,
            Err(DomainError::NotFound { entity: "user", .. })
        ));
        assert!(matches!(
            lifecycle.delete_user(missing).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let lifecycle = lifecycle();

        let first = lifecycle
            .bootstrap_admin("Admin", "admin@example.com", "admin-password")
            .await
            .unwrap();
        assert_eq!(first.map(|u| u.role), Some(Role::Admin));

        let second = lifecycle
            .bootstrap_admin("Admin", "admin@example.com", "admin-password")
            .await
            .unwrap();
        assert!(second.is_none());
    }
}
