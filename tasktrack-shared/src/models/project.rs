/// Project model and database operations
///
/// Projects group tasks and carry a set of member users. A project's
/// `end_date` never precedes its `start_date`; the lifecycle layer checks
/// this before any write and the table enforces it as well.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     start_date TIMESTAMPTZ NOT NULL,
///     end_date TIMESTAMPTZ NOT NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT projects_dates_ordered CHECK (end_date >= start_date)
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::User;

/// Project model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    /// User who created the project (nullable if user deleted)
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone)]
pub struct CreateProject {
    /// Caller-chosen ID; generated when absent
    pub id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Input for updating an existing project
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

const PROJECT_COLUMNS: &str =
    "id, name, description, start_date, end_date, created_by, created_at, updated_at";

impl Project {
    /// Builds a project record from creation input without touching the database
    pub fn from_create(data: CreateProject) -> Self {
        let now = Utc::now();
        Self {
            id: data.id.unwrap_or_else(Uuid::new_v4),
            name: data.name,
            description: data.description,
            start_date: data.start_date,
            end_date: data.end_date,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place
    pub fn apply(&mut self, data: UpdateProject) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(description) = data.description {
            self.description = description;
        }
        if let Some(start_date) = data.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = data.end_date {
            self.end_date = end_date;
        }
        self.updated_at = Utc::now();
    }

    /// Whether the project's dates are correctly ordered
    pub fn dates_ordered(&self) -> bool {
        self.end_date >= self.start_date
    }

    /// Creates a new project
    ///
    /// # Errors
    ///
    /// Returns an error if the ID already exists or the date check fails.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = Self::from_create(data);

        let query = format!(
            r#"
            INSERT INTO projects (id, name, description, start_date, end_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(project.id)
            .bind(project.name)
            .bind(project.description)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(project.created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists projects, oldest first
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Updates an existing project
    ///
    /// Only non-None fields in `data` will be updated.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("name", data.name.is_some()),
            ("description", data.description.is_some()),
            ("start_date", data.start_date.is_some()),
            ("end_date", data.end_date.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {PROJECT_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            q = q.bind(end_date);
        }

        q.fetch_optional(pool).await
    }

    /// Case-insensitive substring search over name and description
    ///
    /// `pattern` is an already-escaped `ILIKE` pattern (see
    /// [`crate::store::postgres::like_pattern`]).
    pub async fn search(pool: &PgPool, pattern: &str) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE name ILIKE $1 ESCAPE '\' OR description ILIKE $1 ESCAPE '\'
            ORDER BY created_at, id
            "#
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(pattern)
            .fetch_all(pool)
            .await
    }

    /// Lists the users who are members of a project, in join order
    pub async fn members(pool: &PgPool, project_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.role_id, u.timezone,
                   u.language, u.created_at, u.updated_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.added_at, u.id
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Adds a member; adding an existing member is a no-op
    pub async fn add_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Removes a member
    ///
    /// # Returns
    ///
    /// True if the membership existed
    pub async fn remove_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
