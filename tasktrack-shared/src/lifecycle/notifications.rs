use tracing::debug;
use uuid::Uuid;

use super::{DomainError, DomainResult, Lifecycle, Violations};
use crate::models::notification::{CreateNotification, Notification};

/// Input for notifying a user
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub content: String,
    pub related_id: Option<Uuid>,
}

impl Lifecycle {
    /// Creates an unread notification for an existing user
    pub async fn notify(&self, data: NewNotification) -> DomainResult<Notification> {
        let mut violations = Violations::default();
        violations.require_text("type", &data.kind);
        violations.require_text("content", &data.content);

        match data.user_id {
            None => violations.push("user_id", "user_id is required"),
            Some(user_id) => {
                if self.store.find_user(user_id).await?.is_none() {
                    violations.push("user_id", format!("user {} does not exist", user_id));
                }
            }
        }
        violations.finish()?;

        let Some(user_id) = data.user_id else {
            return Err(DomainError::invalid("user_id", "user_id is required"));
        };

        let notification = self
            .store
            .create_notification(CreateNotification {
                user_id,
                kind: data.kind.trim().to_string(),
                content: data.content.trim().to_string(),
                related_id: data.related_id,
            })
            .await?;

        debug!(notification_id = %notification.id, %user_id, "Created notification");
        Ok(notification)
    }

    /// The caller's notifications, newest first
    pub async fn notifications_for(&self, user_id: Uuid) -> DomainResult<Vec<Notification>> {
        Ok(self.store.list_notifications(user_id).await?)
    }

    /// Marks one of `user_id`'s notifications read
    ///
    /// Someone else's notification is reported as not found.
    pub async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> DomainResult<Notification> {
        self.store
            .mark_notification_read(user_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("notification", id))
    }
}
