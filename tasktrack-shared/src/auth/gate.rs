/// Access control gate
///
/// Every protected request passes through [`AccessGate::authorize`] before
/// any domain work happens. The gate:
///
/// 1. Extracts the bearer token from the `Authorization` header
/// 2. Validates it and resolves the subject to a stored user
/// 3. Checks the user's role against the static requirement of the
///    [`Operation`] being performed
///
/// The result is an [`AuthContext`] that the caller passes along explicitly.
/// Roles are read from the store on every call, so a role change or a
/// deleted account takes effect on the next request.
///
/// # Permission Table
///
/// | Operation | Requirement |
/// |---|---|
/// | list/create/update/delete users, list roles | `admin` |
/// | everything else | any authenticated user |
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_shared::auth::gate::{AccessGate, Operation};
/// use tasktrack_shared::store::MemoryStore;
///
/// # async fn example(header: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
/// let gate = AccessGate::new(Arc::new(MemoryStore::new()), "secret-key-at-least-32-bytes-long!");
///
/// let ctx = gate.authorize(header, Operation::ListUsers).await?;
/// println!("admin {} listed users", ctx.user_id);
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use super::jwt::{self, Claims, JwtError, DEFAULT_EXPIRATION_HOURS};
use super::password::{self, PasswordError};
use crate::models::{role::Role, user::User};
use crate::store::{SharedStore, StoreError};

/// What an operation demands of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any valid session
    Authenticated,

    /// A session whose user holds this role
    Role(Role),
}

impl Requirement {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Requirement::Authenticated => true,
            Requirement::Role(required) => *required == role,
        }
    }
}

/// Every protected operation the service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ListRoles,
    GetCurrentUser,

    ListProjects,
    CreateProject,
    GetProject,
    UpdateProject,
    DeleteProject,
    ListProjectTasks,
    ListProjectMembers,
    AddProjectMember,
    RemoveProjectMember,

    ListTasks,
    CreateTask,
    GetTask,
    UpdateTask,
    DeleteTask,

    ListSubtasks,
    CreateSubtask,
    GetSubtask,
    UpdateSubtask,
    DeleteSubtask,

    ListComments,
    CreateComment,

    ListNotifications,
    CreateNotification,
    MarkNotificationRead,

    Search,
}

impl Operation {
    pub const ALL: [Operation; 31] = [
        Operation::ListUsers,
        Operation::CreateUser,
        Operation::UpdateUser,
        Operation::DeleteUser,
        Operation::ListRoles,
        Operation::GetCurrentUser,
        Operation::ListProjects,
        Operation::CreateProject,
        Operation::GetProject,
        Operation::UpdateProject,
        Operation::DeleteProject,
        Operation::ListProjectTasks,
        Operation::ListProjectMembers,
        Operation::AddProjectMember,
        Operation::RemoveProjectMember,
        Operation::ListTasks,
        Operation::CreateTask,
        Operation::GetTask,
        Operation::UpdateTask,
        Operation::DeleteTask,
        Operation::ListSubtasks,
        Operation::CreateSubtask,
        Operation::GetSubtask,
        Operation::UpdateSubtask,
        Operation::DeleteSubtask,
        Operation::ListComments,
        Operation::CreateComment,
        Operation::ListNotifications,
        Operation::CreateNotification,
        Operation::MarkNotificationRead,
        Operation::Search,
    ];

    /// Role requirement for this operation
    pub fn requirement(&self) -> Requirement {
        match self {
            Operation::ListUsers
            | Operation::CreateUser
            | Operation::UpdateUser
            | Operation::DeleteUser
            | Operation::ListRoles => Requirement::Role(Role::Admin),

            Operation::GetCurrentUser
            | Operation::ListProjects
            | Operation::CreateProject
            | Operation::GetProject
            | Operation::UpdateProject
            | Operation::DeleteProject
            | Operation::ListProjectTasks
            | Operation::ListProjectMembers
            | Operation::AddProjectMember
            | Operation::RemoveProjectMember
            | Operation::ListTasks
            | Operation::CreateTask
            | Operation::GetTask
            | Operation::UpdateTask
            | Operation::DeleteTask
            | Operation::ListSubtasks
            | Operation::CreateSubtask
            | Operation::GetSubtask
            | Operation::UpdateSubtask
            | Operation::DeleteSubtask
            | Operation::ListComments
            | Operation::CreateComment
            | Operation::ListNotifications
            | Operation::CreateNotification
            | Operation::MarkNotificationRead
            | Operation::Search => Requirement::Authenticated,
        }
    }

    /// HTTP method and route template (axum syntax)
    pub fn route(&self) -> (&'static str, &'static str) {
        match self {
            Operation::ListUsers => ("GET", "/users"),
            Operation::CreateUser => ("POST", "/users"),
            Operation::UpdateUser => ("PUT", "/users/:id"),
            Operation::DeleteUser => ("DELETE", "/users/:id"),
            Operation::ListRoles => ("GET", "/users/roles"),
            Operation::GetCurrentUser => ("GET", "/users/me"),

            Operation::ListProjects => ("GET", "/projects"),
            Operation::CreateProject => ("POST", "/projects"),
            Operation::GetProject => ("GET", "/projects/:id"),
            Operation::UpdateProject => ("PATCH", "/projects/:id"),
            Operation::DeleteProject => ("DELETE", "/projects/:id"),
            Operation::ListProjectTasks => ("GET", "/projects/:id/tasks"),
            Operation::ListProjectMembers => ("GET", "/projects/:id/members"),
            Operation::AddProjectMember => ("POST", "/projects/:id/members/:user_id"),
            Operation::RemoveProjectMember => ("DELETE", "/projects/:id/members/:user_id"),

            Operation::ListTasks => ("GET", "/tasks"),
            Operation::CreateTask => ("POST", "/tasks"),
            Operation::GetTask => ("GET", "/tasks/:id"),
            Operation::UpdateTask => ("PATCH", "/tasks/:id"),
            Operation::DeleteTask => ("DELETE", "/tasks/:id"),

            Operation::ListSubtasks => ("GET", "/tasks/:id/subtasks"),
            Operation::CreateSubtask => ("POST", "/tasks/:id/subtasks"),
            Operation::GetSubtask => ("GET", "/tasks/:id/subtasks/:subtask_id"),
            Operation::UpdateSubtask => ("PATCH", "/tasks/:id/subtasks/:subtask_id"),
            Operation::DeleteSubtask => ("DELETE", "/tasks/:id/subtasks/:subtask_id"),

            Operation::ListComments => ("GET", "/tasks/:id/comments"),
            Operation::CreateComment => ("POST", "/tasks/:id/comments"),

            Operation::ListNotifications => ("GET", "/notifications"),
            Operation::CreateNotification => ("POST", "/notifications"),
            Operation::MarkNotificationRead => ("PATCH", "/notifications/:id/read"),

            Operation::Search => ("GET", "/search"),
        }
    }

    /// Looks up the operation served by `method` on `route` (a route
    /// template, not a concrete path). `HEAD` is served by the `GET` handler.
    pub fn resolve(method: &str, route: &str) -> Option<Self> {
        let method = if method.eq_ignore_ascii_case("HEAD") {
            "GET"
        } else {
            method
        };
        Self::ALL.into_iter().find(|op| {
            let (op_method, op_route) = op.route();
            op_method.eq_ignore_ascii_case(method) && op_route == route
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListUsers => "list_users",
            Operation::CreateUser => "create_user",
            Operation::UpdateUser => "update_user",
            Operation::DeleteUser => "delete_user",
            Operation::ListRoles => "list_roles",
            Operation::GetCurrentUser => "get_current_user",
            Operation::ListProjects => "list_projects",
            Operation::CreateProject => "create_project",
            Operation::GetProject => "get_project",
            Operation::UpdateProject => "update_project",
            Operation::DeleteProject => "delete_project",
            Operation::ListProjectTasks => "list_project_tasks",
            Operation::ListProjectMembers => "list_project_members",
            Operation::AddProjectMember => "add_project_member",
            Operation::RemoveProjectMember => "remove_project_member",
            Operation::ListTasks => "list_tasks",
            Operation::CreateTask => "create_task",
            Operation::GetTask => "get_task",
            Operation::UpdateTask => "update_task",
            Operation::DeleteTask => "delete_task",
            Operation::ListSubtasks => "list_subtasks",
            Operation::CreateSubtask => "create_subtask",
            Operation::GetSubtask => "get_subtask",
            Operation::UpdateSubtask => "update_subtask",
            Operation::DeleteSubtask => "delete_subtask",
            Operation::ListComments => "list_comments",
            Operation::CreateComment => "create_comment",
            Operation::ListNotifications => "list_notifications",
            Operation::CreateNotification => "create_notification",
            Operation::MarkNotificationRead => "mark_notification_read",
            Operation::Search => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the caller for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

/// Error type for the access gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, malformed, expired or unresolvable credentials
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// Authenticated, but the role doesn't satisfy the operation
    #[error("Operation {operation} requires role {required}, caller has {actual}")]
    Forbidden {
        operation: Operation,
        required: Role,
        actual: Role,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),
}

/// Resolves credentials and enforces the permission table
#[derive(Clone)]
pub struct AccessGate {
    store: SharedStore,
    secret: String,
    token_ttl: Duration,
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Creates a gate issuing tokens with the default 24 hour lifetime
    pub fn new(store: SharedStore, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
            token_ttl: Duration::hours(DEFAULT_EXPIRATION_HOURS),
        }
    }

    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    /// Issues a session token for a user
    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let claims = Claims::with_expiration(user_id, self.token_ttl);
        Ok(jwt::create_token(&claims, &self.secret)?)
    }

    /// Checks credentials and issues a token
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), AuthError> {
        let invalid = || AuthError::Unauthenticated("Invalid email or password".to_string());

        let user = self
            .store
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !password::verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(invalid());
        }

        let token = self.issue_token(user.id)?;
        Ok((token, user))
    }

    /// Resolves the caller from an `Authorization` header value and checks
    /// they may perform `operation`
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthenticated`] if the header is missing, isn't a
    ///   bearer token, fails validation, or names a user that no longer exists
    /// - [`AuthError::Forbidden`] if the user's role doesn't meet the
    ///   operation's requirement
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
        operation: Operation,
    ) -> Result<AuthContext, AuthError> {
        let header = authorization.ok_or_else(|| {
            AuthError::Unauthenticated("Missing authorization header".to_string())
        })?;

        let token = jwt::extract_bearer(header)
            .ok_or_else(|| AuthError::Unauthenticated("Expected Bearer token".to_string()))?;

        let claims = jwt::validate_token(token, &self.secret)
            .map_err(|e| AuthError::Unauthenticated(e.to_string()))?;

        let user = self
            .store
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| AuthError::Unauthenticated("Unknown user".to_string()))?;

        if let Requirement::Role(required) = operation.requirement() {
            if user.role != required {
                debug!(user_id = %user.id, %operation, role = %user.role, "Access denied");
                return Err(AuthError::Forbidden {
                    operation,
                    required,
                    actual: user.role,
                });
            }
        }

        Ok(AuthContext {
            user_id: user.id,
            role: user.role,
        })
    }
}
