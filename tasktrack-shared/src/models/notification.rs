/// Notification model and database operations
///
/// Notifications are stored per user. Delivery (email, push) happens
/// elsewhere; this model only records them and their read state.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     type VARCHAR(50) NOT NULL,
///     content TEXT NOT NULL,
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     related_id UUID,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A notification addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Free-form kind, e.g. `task_assigned`
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,

    pub content: String,
    pub is_read: bool,

    /// Task or project the notification is about
    pub related_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub content: String,
    pub related_id: Option<Uuid>,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, type, content, is_read, related_id, created_at, updated_at";

impl Notification {
    pub fn from_create(data: CreateNotification) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            kind: data.kind,
            content: data.content,
            is_read: false,
            related_id: data.related_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = Self::from_create(data);

        let query = format!(
            r#"
            INSERT INTO notifications (id, user_id, type, content, is_read, related_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(notification.id)
            .bind(notification.user_id)
            .bind(notification.kind)
            .bind(notification.content)
            .bind(notification.is_read)
            .bind(notification.related_id)
            .fetch_one(pool)
            .await
    }

    /// Lists a user's notifications, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC, id"
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Marks one of a user's notifications as read
    ///
    /// Returns None when the notification doesn't exist or belongs to
    /// another user.
    pub async fn mark_read(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET is_read = TRUE, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
