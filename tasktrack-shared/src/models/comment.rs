/// Comment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY,
///     content TEXT NOT NULL CHECK (length(btrim(content)) > 0),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A comment on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub task_id: Uuid,

    /// Author
    pub user_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

const COMMENT_COLUMNS: &str = "id, content, task_id, user_id, created_at, updated_at";

impl Comment {
    pub fn from_create(data: CreateComment) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: data.content,
            task_id: data.task_id,
            user_id: data.user_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let comment = Self::from_create(data);

        let query = format!(
            r#"
            INSERT INTO comments (id, content, task_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(comment.id)
            .bind(comment.content)
            .bind(comment.task_id)
            .bind(comment.user_id)
            .fetch_one(pool)
            .await
    }

    /// Lists a task's comments, oldest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE task_id = $1 ORDER BY created_at, id"
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }
}
