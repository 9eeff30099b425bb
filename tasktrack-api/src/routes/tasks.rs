/// Task endpoints, including subtasks and comments
///
/// # Endpoints
///
/// - `GET /tasks` - List tasks
/// - `POST /tasks` - Create task
/// - `GET /tasks/:id` - Get task
/// - `PATCH /tasks/:id` - Update task
/// - `DELETE /tasks/:id` - Delete task
/// - `GET /tasks/:id/subtasks` - List subtasks
/// - `POST /tasks/:id/subtasks` - Create subtask
/// - `GET /tasks/:id/subtasks/:subtask_id` - Get subtask
/// - `PATCH /tasks/:id/subtasks/:subtask_id` - Update subtask
/// - `DELETE /tasks/:id/subtasks/:subtask_id` - Delete subtask
/// - `GET /tasks/:id/comments` - List comments
/// - `POST /tasks/:id/comments` - Add comment
///
/// # Status values
///
/// `Open` (default), `InProgress`, `Done`, `Canceled`, matched
/// case-insensitively (`in_progress` also works). Which changes are allowed
/// depends on the configured transition policy.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::{nullable, MessageResponse, PageQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tasktrack_shared::{
    auth::gate::AuthContext,
    lifecycle::{NewSubtask, NewTask, SubtaskChanges, TaskChanges},
    models::{
        comment::Comment, datetime::flexible_option, subtask::Subtask, task::Task,
    },
};
use uuid::Uuid;

/// Absent leaves the due date alone; `null` or `""` clears it.
fn nullable_date<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_option(deserializer).map(Some)
}

/// Create task request
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Client-chosen ID (optional)
    pub id: Option<Uuid>,

    #[serde(default)]
    pub title: String,

    pub description: Option<String>,

    #[serde(default, deserialize_with = "flexible_option")]
    pub due_date: Option<DateTime<Utc>>,

    /// `High`, `Medium` (default) or `Low`
    pub priority: Option<String>,

    pub status: Option<String>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Partial task update
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,

    #[serde(default, deserialize_with = "nullable_date")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub priority: Option<String>,
    pub status: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    #[serde(default)]
    pub title: String,

    pub is_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub is_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.lifecycle.list_tasks(query.into()).await?;
    Ok(Json(tasks))
}

/// Creates a task in an existing project
///
/// # Errors
///
/// - `400 Bad Request`: empty title, unknown priority/status, missing or
///   unknown project, unknown assignee
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state
        .lifecycle
        .create_task(
            auth.user_id,
            NewTask {
                id: req.id,
                title: req.title,
                description: req.description,
                due_date: req.due_date,
                priority: req.priority,
                status: req.status,
                project_id: req.project_id,
                assignee_id: req.assignee_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.lifecycle.get_task(id).await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .lifecycle
        .update_task(
            id,
            TaskChanges {
                title: req.title,
                description: req.description,
                due_date: req.due_date,
                priority: req.priority,
                status: req.status,
                assignee_id: req.assignee_id,
            },
        )
        .await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.lifecycle.delete_task(id).await?;
    Ok(Json(MessageResponse::new("Task deleted")))
}

// Subtasks

pub async fn list_subtasks(
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Subtask>>> {
    let subtasks = state.lifecycle.list_subtasks(task_id).await?;
    Ok(Json(subtasks))
}

pub async fn create_subtask(
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateSubtaskRequest>,
) -> ApiResult<(StatusCode, Json<Subtask>)> {
    let subtask = state
        .lifecycle
        .create_subtask(
            task_id,
            NewSubtask {
                title: req.title,
                is_complete: req.is_complete,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(subtask)))
}

pub async fn get_subtask(
    State(state): State<AppState>,
    ApiPath((task_id, id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Subtask>> {
    let subtask = state.lifecycle.get_subtask(task_id, id).await?;
    Ok(Json(subtask))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    ApiPath((task_id, id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateSubtaskRequest>,
) -> ApiResult<Json<Subtask>> {
    let subtask = state
        .lifecycle
        .update_subtask(
            task_id,
            id,
            SubtaskChanges {
                title: req.title,
                is_complete: req.is_complete,
            },
        )
        .await?;

    Ok(Json(subtask))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    ApiPath((task_id, id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state.lifecycle.delete_subtask(task_id, id).await?;
    Ok(Json(MessageResponse::new("Subtask deleted")))
}

// Comments

pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    let comments = state.lifecycle.list_comments(task_id).await?;
    Ok(Json(comments))
}

/// Adds a comment authored by the caller
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .lifecycle
        .add_comment(task_id, auth.user_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
