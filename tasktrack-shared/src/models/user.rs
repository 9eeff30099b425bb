/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user accounts.
/// Every user holds exactly one [`Role`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,  -- unique on lower(email)
///     password_hash VARCHAR(255) NOT NULL,
///     role_id INTEGER NOT NULL REFERENCES roles(id) DEFAULT 2,
///     timezone VARCHAR(64) NOT NULL DEFAULT 'UTC',
///     language VARCHAR(16) NOT NULL DEFAULT 'en',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::models::role::Role;
/// use tasktrack_shared::models::user::{CreateUser, User};
/// use tasktrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Jane Doe".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::User,
///     timezone: None,
///     language: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "jane@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::role::Role;

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LANGUAGE: &str = "en";

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Access role
    #[sqlx(rename = "role_id")]
    pub role: Role,

    /// IANA timezone name
    pub timezone: String,

    /// Preferred UI language
    pub language: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub role: Role,

    /// Defaults to `UTC`
    pub timezone: Option<String>,

    /// Defaults to `en`
    pub language: Option<String>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role_id, timezone, language, created_at, updated_at";

impl User {
    /// Builds a user record from creation input without touching the database
    pub fn from_create(data: CreateUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            timezone: data.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            language: data.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place
    pub fn apply(&mut self, data: UpdateUser) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(email) = data.email {
            self.email = email;
        }
        if let Some(password_hash) = data.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(role) = data.role {
            self.role = role;
        }
        if let Some(timezone) = data.timezone {
            self.timezone = timezone;
        }
        if let Some(language) = data.language {
            self.language = language;
        }
        self.updated_at = Utc::now();
    }

    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = Self::from_create(data);

        let query = format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role_id, timezone, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role)
            .bind(user.timezone)
            .bind(user.language)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at` timestamp
    /// is automatically set to the current time.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("name", data.name.is_some()),
            ("email", data.email.is_some()),
            ("password_hash", data.password_hash.is_some()),
            ("role_id", data.role.is_some()),
            ("timezone", data.timezone.is_some()),
            ("language", data.language.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(timezone) = data.timezone {
            q = q.bind(timezone);
        }
        if let Some(language) = data.language {
            q = q.bind(language);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user by ID
    ///
    /// Memberships, comments and notifications go with the user; task and
    /// project references to the user are cleared by the foreign keys.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users, oldest first
    ///
    /// A `limit` of `None` returns every row after `offset`.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
