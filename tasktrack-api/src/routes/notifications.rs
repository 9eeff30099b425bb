/// Notification endpoints
///
/// # Endpoints
///
/// - `GET /notifications` - The caller's notifications, newest first
/// - `POST /notifications` - Notify a user
/// - `PATCH /notifications/:id/read` - Mark one of the caller's notifications read

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use tasktrack_shared::{
    auth::gate::AuthContext, lifecycle::NewNotification, models::notification::Notification,
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    /// Recipient
    pub user_id: Option<Uuid>,

    /// Free-form kind, e.g. `task_assigned`
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub content: String,

    /// Task or project the notification is about
    pub related_id: Option<Uuid>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = state.lifecycle.notifications_for(auth.user_id).await?;
    Ok(Json(notifications))
}

pub async fn create_notification(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateNotificationRequest>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    let notification = state
        .lifecycle
        .notify(NewNotification {
            user_id: req.user_id,
            kind: req.kind,
            content: req.content,
            related_id: req.related_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Someone else's notification answers 404
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Notification>> {
    let notification = state
        .lifecycle
        .mark_notification_read(auth.user_id, id)
        .await?;

    Ok(Json(notification))
}
