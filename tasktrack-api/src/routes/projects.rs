/// Project endpoints
///
/// # Endpoints
///
/// - `GET /projects` - List projects
/// - `POST /projects` - Create project
/// - `GET /projects/:id` - Get project
/// - `PATCH /projects/:id` - Update project
/// - `DELETE /projects/:id` - Delete project
/// - `GET /projects/:id/tasks` - Tasks in a project
/// - `GET /projects/:id/members` - Project members
/// - `POST /projects/:id/members/:user_id` - Add member
/// - `DELETE /projects/:id/members/:user_id` - Remove member
///
/// Dates accept RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::{MessageResponse, PageQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tasktrack_shared::{
    auth::gate::AuthContext,
    lifecycle::{NewProject, ProjectChanges},
    models::{datetime::flexible_option, project::Project, task::Task, user::User},
};
use uuid::Uuid;

/// Create project request
///
/// Missing required fields are reported as field errors rather than
/// rejected as malformed JSON.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Client-chosen ID (optional)
    pub id: Option<Uuid>,

    #[serde(default)]
    pub name: String,

    pub description: Option<String>,

    #[serde(default, deserialize_with = "flexible_option")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "flexible_option")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Partial project update
#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,

    #[serde(default, deserialize_with = "flexible_option")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "flexible_option")]
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = state.lifecycle.list_projects(query.into()).await?;
    Ok(Json(projects))
}

/// Creates a project owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: empty name, missing dates, or `end_date` before `start_date`
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state
        .lifecycle
        .create_project(
            auth.user_id,
            NewProject {
                id: req.id,
                name: req.name,
                description: req.description,
                start_date: req.start_date,
                end_date: req.end_date,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = state.lifecycle.get_project(id).await?;
    Ok(Json(project))
}

/// Updates a project; the date order is checked against the merged values
pub async fn update_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let project = state
        .lifecycle
        .update_project(
            id,
            ProjectChanges {
                name: req.name,
                description: req.description,
                start_date: req.start_date,
                end_date: req.end_date,
            },
        )
        .await?;

    Ok(Json(project))
}

/// Deletes a project
///
/// Its tasks are removed or the delete is refused, depending on the
/// configured deletion policy.
pub async fn delete_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.lifecycle.delete_project(id).await?;
    Ok(Json(MessageResponse::new("Project deleted")))
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.lifecycle.project_tasks(id).await?;
    Ok(Json(tasks))
}

pub async fn list_members(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<User>>> {
    let members = state.lifecycle.project_members(id).await?;
    Ok(Json(members))
}

/// Adds a user to a project; adding an existing member is a no-op
pub async fn add_member(
    State(state): State<AppState>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    state.lifecycle.add_project_member(id, user_id).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Member added"))))
}

pub async fn remove_member(
    State(state): State<AppState>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state.lifecycle.remove_project_member(id, user_id).await?;
    Ok(Json(MessageResponse::new("Member removed")))
}
