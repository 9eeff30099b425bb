//! Domain store: the persistence contract for every entity.
//!
//! The [`Store`] trait is what the lifecycle, access-control and search
//! layers talk to. Two adapters implement it:
//!
//! - [`memory::MemoryStore`]: everything behind one lock, used by tests and
//!   for running without a database
//! - [`postgres::PgStore`]: PostgreSQL via the row operations in
//!   [`crate::models`]
//!
//! Both adapters return lists ordered by `(created_at, id)` so results are
//! stable for a fixed data set.
//!
//! # Deletion
//!
//! What happens to a project's tasks, or a task's subtasks and comments, is
//! set per store with [`DeletionPolicy`]. Memberships always go with their
//! project.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    comment::{Comment, CreateComment},
    notification::{CreateNotification, Notification},
    project::{CreateProject, Project, UpdateProject},
    role::RoleRecord,
    subtask::{CreateSubtask, Subtask, UpdateSubtask},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, UpdateUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle to a store implementation.
pub type SharedStore = Arc<dyn Store>;

/// Errors returned by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness, reference or deletion-policy constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => {
                        "email already exists".to_string()
                    }
                    Some(constraint) => format!("constraint violation: {}", constraint),
                    None => db_err.message().to_string(),
                };
                return StoreError::Conflict(message);
            }

            if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }

        StoreError::Backend(err.to_string())
    }
}

pub(crate) fn status_changed(id: Uuid) -> StoreError {
    StoreError::Conflict(format!("task {} changed status concurrently", id))
}

/// How deletes treat dependent records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Deleting a project removes its tasks; deleting a task removes its
    /// subtasks and comments.
    #[default]
    Cascade,

    /// Deleting a project with tasks, or a task with subtasks or comments,
    /// fails with [`StoreError::Conflict`].
    Restrict,
}

impl DeletionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionPolicy::Cascade => "cascade",
            DeletionPolicy::Restrict => "restrict",
        }
    }
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(DeletionPolicy::Cascade),
            "restrict" => Ok(DeletionPolicy::Restrict),
            other => Err(format!(
                "unknown deletion policy '{}': expected cascade or restrict",
                other
            )),
        }
    }
}

/// Window into a list.
///
/// `Page::all()` returns everything; numbered pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 100;

    pub fn all() -> Self {
        Self::default()
    }

    /// Page `number` of `size` items. Out-of-range inputs are clamped:
    /// page 0 reads as 1, size 0 as the default and anything above
    /// [`Page::MAX_SIZE`] as the maximum.
    pub fn numbered(number: u32, size: u32) -> Self {
        let number = number.max(1);
        let size = match size {
            0 => Self::DEFAULT_SIZE,
            s => s.min(Self::MAX_SIZE),
        };

        Self {
            limit: Some(size),
            offset: (number - 1).saturating_mul(size),
        }
    }

    /// Builds a page from optional query parameters; no parameters means all rows.
    pub fn from_query(page: Option<u32>, size: Option<u32>) -> Self {
        match (page, size) {
            (None, None) => Self::all(),
            (page, size) => Self::numbered(page.unwrap_or(1), size.unwrap_or(Self::DEFAULT_SIZE)),
        }
    }

    /// Applies the window to an already-ordered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped = items.into_iter().skip(self.offset as usize);
        match self.limit {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        }
    }
}

/// Persistence contract for the tracking domain.
///
/// `find_*`/`update_*` return `None` and `delete_*` return `false` when the
/// target does not exist; absence is never an error at this layer.
#[async_trait]
pub trait Store: Send + Sync {
    /// Policy applied by `delete_project` and `delete_task`.
    fn deletion_policy(&self) -> DeletionPolicy;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    // Users

    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the email (case-insensitive) is taken.
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self, page: Page) -> StoreResult<Vec<User>>;
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Removes the user with their memberships, comments and notifications,
    /// and clears task/project references to them.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>>;

    // Projects

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project>;
    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;
    async fn list_projects(&self, page: Page) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, id: Uuid, data: UpdateProject)
        -> StoreResult<Option<Project>>;
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;

    /// Case-insensitive substring match on name or description.
    async fn search_projects(&self, needle: &str) -> StoreResult<Vec<Project>>;

    async fn list_project_members(&self, project_id: Uuid) -> StoreResult<Vec<User>>;

    /// Idempotent.
    async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<()>;
    async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid)
        -> StoreResult<bool>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn list_tasks(&self, page: Page) -> StoreResult<Vec<Task>>;
    async fn list_project_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>>;
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when `expected_status` is set and the stored
    /// status no longer matches it.
    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Case-insensitive substring match on title or description.
    async fn search_tasks(&self, needle: &str) -> StoreResult<Vec<Task>>;

    // Subtasks

    async fn create_subtask(&self, data: CreateSubtask) -> StoreResult<Subtask>;
    async fn find_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<Option<Subtask>>;
    async fn list_subtasks(&self, task_id: Uuid) -> StoreResult<Vec<Subtask>>;
    async fn update_subtask(
        &self,
        task_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> StoreResult<Option<Subtask>>;
    async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool>;

    // Comments

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment>;
    async fn list_comments(&self, task_id: Uuid) -> StoreResult<Vec<Comment>>;

    // Notifications

    async fn create_notification(&self, data: CreateNotification) -> StoreResult<Notification>;

    /// Newest first.
    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<Notification>>;
}
