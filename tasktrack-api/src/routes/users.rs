/// User endpoints
///
/// This module provides account endpoints:
/// - Registration and login (public)
/// - The caller's own record
/// - User and role administration (admin only)
///
/// # Endpoints
///
/// - `POST /users/register` - Register new user
/// - `POST /users/login` - Login and get a token
/// - `GET /users/me` - Current user
/// - `GET /users` - List users (admin)
/// - `POST /users` - Create user with any role (admin)
/// - `PUT /users/:id` - Update user (admin)
/// - `DELETE /users/:id` - Delete user (admin)
/// - `GET /users/roles` - List roles (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::{MessageResponse, PageQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tasktrack_shared::{
    auth::gate::AuthContext,
    lifecycle::{NewUser, UserChanges},
    models::{
        role::{Role, RoleRecord},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: String,

    /// Email address; trimmed and format-checked by the lifecycle
    pub email: String,

    /// Password (at least 8 characters)
    pub password: String,

    pub timezone: Option<String>,
    pub language: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token response for register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,

    pub user: User,
}

/// Admin user creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: String,

    pub email: String,

    pub password: String,

    /// `admin` or `user` (default: user)
    pub role: Option<String>,

    pub timezone: Option<String>,
    pub language: Option<String>,
}

/// User update request; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    pub email: Option<String>,

    pub password: Option<String>,
    pub role: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

fn parse_role(raw: Option<&str>) -> ApiResult<Option<Role>> {
    raw.map(|r| r.parse::<Role>())
        .transpose()
        .map_err(|e| ApiError::invalid("role", e.to_string()))
}

/// Register a new user
///
/// Self-registered accounts always get the `user` role.
///
/// # Endpoint
///
/// ```text
/// POST /users/register
/// Content-Type: application/json
///
/// {
///   "name": "Jane Doe",
///   "email": "jane@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"token": "eyJ...", "user": {...}}`
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `500 Internal Server Error`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let user = state
        .lifecycle
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            role: Role::User,
            timezone: req.timezone,
            language: req.language,
        })
        .await?;

    let token = state.gate.issue_token(user.id)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (token, user) = state.gate.login(&req.email, &req.password).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// Returns the caller's own record
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = state.lifecycle.get_user(auth.user_id).await?;
    Ok(Json(user))
}

/// Lists users, oldest first
///
/// Accepts optional `page` and `page_size` query parameters.
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let users = state.lifecycle.list_users(query.into()).await?;
    Ok(Json(users))
}

/// Creates a user with any role
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;
    let role = parse_role(req.role.as_deref())?.unwrap_or(Role::User);

    let user = state
        .lifecycle
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            role,
            timezone: req.timezone,
            language: req.language,
        })
        .await?;

    tracing::info!(admin_id = %auth.user_id, user_id = %user.id, role = %role, "Admin created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Updates a user
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;
    let role = parse_role(req.role.as_deref())?;

    let user = state
        .lifecycle
        .update_user(
            id,
            UserChanges {
                name: req.name,
                email: req.email,
                password: req.password,
                role,
                timezone: req.timezone,
                language: req.language,
            },
        )
        .await?;

    Ok(Json(user))
}

/// Deletes a user
///
/// Tasks and projects they created or were assigned keep existing with the
/// reference cleared.
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.lifecycle.delete_user(id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

/// Lists the fixed role set
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Json<Vec<RoleRecord>>> {
    let roles = state.lifecycle.list_roles().await?;
    Ok(Json(roles))
}
