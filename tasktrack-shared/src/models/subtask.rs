/// Subtask model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subtasks (
///     id UUID PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     is_complete BOOLEAN NOT NULL DEFAULT FALSE,
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A checklist item on a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub is_complete: bool,
    pub task_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSubtask {
    pub task_id: Uuid,
    pub title: String,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub is_complete: Option<bool>,
}

const SUBTASK_COLUMNS: &str = "id, title, is_complete, task_id, created_at, updated_at";

impl Subtask {
    pub fn from_create(data: CreateSubtask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: data.title,
            is_complete: data.is_complete,
            task_id: data.task_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, data: UpdateSubtask) {
        if let Some(title) = data.title {
            self.title = title;
        }
        if let Some(is_complete) = data.is_complete {
            self.is_complete = is_complete;
        }
        self.updated_at = Utc::now();
    }

    pub async fn create(pool: &PgPool, data: CreateSubtask) -> Result<Self, sqlx::Error> {
        let subtask = Self::from_create(data);

        let query = format!(
            r#"
            INSERT INTO subtasks (id, title, is_complete, task_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUBTASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(subtask.id)
            .bind(subtask.title)
            .bind(subtask.is_complete)
            .bind(subtask.task_id)
            .fetch_one(pool)
            .await
    }

    /// Finds a subtask by ID within its parent task
    pub async fn find(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE id = $1 AND task_id = $2");

        sqlx::query_as::<_, Subtask>(&query)
            .bind(id)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE task_id = $1 ORDER BY created_at, id"
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE subtasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.is_complete.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_complete = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND task_id = $2 RETURNING {SUBTASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Subtask>(&query).bind(id).bind(task_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(is_complete) = data.is_complete {
            q = q.bind(is_complete);
        }

        q.fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, task_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = $1 AND task_id = $2")
            .bind(id)
            .bind(task_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
