/// Access roles
///
/// The role set is closed: every user is either an `admin` or a plain `user`.
/// Role ids are fixed and seeded by the initial migration.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id INTEGER PRIMARY KEY,
///     name VARCHAR(50) NOT NULL UNIQUE,
///     description TEXT NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// INSERT INTO roles (id, name, description) VALUES
///     (1, 'admin', 'Full administrative access'),
///     (2, 'user', 'Standard user access');
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// Role held by a user
///
/// Stored as the integer `role_id` column on `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator: may manage users and roles
    Admin = 1,

    /// Regular authenticated user
    User = 2,
}

impl Role {
    /// All roles, in id order
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    /// Numeric role id as stored in the database
    pub fn id(&self) -> i32 {
        *self as i32
    }

    /// Looks up a role by its numeric id
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::User),
            _ => None,
        }
    }

    /// Role name (`admin` or `user`)
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Full administrative access",
            Role::User => "Standard user access",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Row from the `roles` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleRecord {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl From<Role> for RoleRecord {
    fn from(role: Role) -> Self {
        Self {
            id: role.id(),
            name: role.name().to_string(),
            description: role.description().to_string(),
        }
    }
}

impl RoleRecord {
    /// Lists all roles, ordered by id
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let roles = sqlx::query_as::<_, RoleRecord>(
            r#"
            SELECT id, name, description
            FROM roles
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(roles)
    }
}
