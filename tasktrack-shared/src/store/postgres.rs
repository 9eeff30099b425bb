//! PostgreSQL store.
//!
//! Most operations delegate to the row operations on the model types. Deletes
//! that touch several tables run in one transaction.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{status_changed, DeletionPolicy, Page, Store, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    comment::{Comment, CreateComment},
    notification::{CreateNotification, Notification},
    project::{CreateProject, Project, UpdateProject},
    role::RoleRecord,
    subtask::{CreateSubtask, Subtask, UpdateSubtask},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, UpdateUser, User},
};

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    deletion: DeletionPolicy,
}

impl PgStore {
    pub fn new(pool: PgPool, deletion: DeletionPolicy) -> Self {
        Self { pool, deletion }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Builds an `ILIKE ... ESCAPE '\'` pattern matching `needle` anywhere.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn limit_offset(page: Page) -> (Option<i64>, i64) {
    (page.limit.map(i64::from), i64::from(page.offset))
}

#[async_trait]
impl Store for PgStore {
    fn deletion_policy(&self) -> DeletionPolicy {
        self.deletion
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self, page: Page) -> StoreResult<Vec<User>> {
        let (limit, offset) = limit_offset(page);
        Ok(User::list(&self.pool, limit, offset).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        Ok(RoleRecord::list(&self.pool).await?)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects(&self, page: Page) -> StoreResult<Vec<Project>> {
        let (limit, offset) = limit_offset(page);
        Ok(Project::list(&self.pool, limit, offset).await?)
    }

    async fn update_project(
        &self,
        id: Uuid,
        data: UpdateProject,
    ) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, id, data).await?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        match self.deletion {
            DeletionPolicy::Restrict => {
                let (count,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
                        .bind(id)
                        .fetch_one(&mut *tx)
                        .await?;
                if count > 0 {
                    return Err(StoreError::Conflict(format!(
                        "project {} still has {} task(s)",
                        id, count
                    )));
                }
            }
            DeletionPolicy::Cascade => {
                for statement in [
                    "DELETE FROM comments WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)",
                    "DELETE FROM subtasks WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)",
                    "DELETE FROM tasks WHERE project_id = $1",
                ] {
                    let result = sqlx::query(statement).bind(id).execute(&mut *tx).await?;
                    debug!(project_id = %id, rows = result.rows_affected(), "{}", statement);
                }
            }
        }

        // project_members rows cascade via foreign key
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_projects(&self, needle: &str) -> StoreResult<Vec<Project>> {
        Ok(Project::search(&self.pool, &like_pattern(needle)).await?)
    }

    async fn list_project_members(&self, project_id: Uuid) -> StoreResult<Vec<User>> {
        Ok(Project::members(&self.pool, project_id).await?)
    }

    async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        Ok(Project::add_member(&self.pool, project_id, user_id).await?)
    }

    async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(Project::remove_member(&self.pool, project_id, user_id).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, page: Page) -> StoreResult<Vec<Task>> {
        let (limit, offset) = limit_offset(page);
        Ok(Task::list(&self.pool, limit, offset).await?)
    }

    async fn list_project_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_project(&self.pool, project_id).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let guarded = data.expected_status.is_some();
        match Task::update(&self.pool, id, data).await? {
            Some(task) => Ok(Some(task)),
            // The row exists, so the status guard is what filtered it out
            None if guarded && Task::find_by_id(&self.pool, id).await?.is_some() => {
                Err(status_changed(id))
            }
            None => Ok(None),
        }
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        match self.deletion {
            DeletionPolicy::Restrict => {
                let (subtasks, comments): (i64, i64) = sqlx::query_as(
                    r#"
                    SELECT (SELECT COUNT(*) FROM subtasks WHERE task_id = $1),
                           (SELECT COUNT(*) FROM comments WHERE task_id = $1)
                    "#,
                )
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                if subtasks + comments > 0 {
                    return Err(StoreError::Conflict(format!(
                        "task {} still has {} subtask(s) and {} comment(s)",
                        id, subtasks, comments
                    )));
                }
            }
            DeletionPolicy::Cascade => {
                sqlx::query("DELETE FROM comments WHERE task_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM subtasks WHERE task_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_tasks(&self, needle: &str) -> StoreResult<Vec<Task>> {
        Ok(Task::search(&self.pool, &like_pattern(needle)).await?)
    }

    async fn create_subtask(&self, data: CreateSubtask) -> StoreResult<Subtask> {
        Ok(Subtask::create(&self.pool, data).await?)
    }

    async fn find_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<Option<Subtask>> {
        Ok(Subtask::find(&self.pool, task_id, id).await?)
    }

    async fn list_subtasks(&self, task_id: Uuid) -> StoreResult<Vec<Subtask>> {
        Ok(Subtask::list_by_task(&self.pool, task_id).await?)
    }

    async fn update_subtask(
        &self,
        task_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> StoreResult<Option<Subtask>> {
        Ok(Subtask::update(&self.pool, task_id, id, data).await?)
    }

    async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(Subtask::delete(&self.pool, task_id, id).await?)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn list_comments(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_by_task(&self.pool, task_id).await?)
    }

    async fn create_notification(&self, data: CreateNotification) -> StoreResult<Notification> {
        Ok(Notification::create(&self.pool, data).await?)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        Ok(Notification::list_by_user(&self.pool, user_id).await?)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        Ok(Notification::mark_read(&self.pool, user_id, id).await?)
    }
}
