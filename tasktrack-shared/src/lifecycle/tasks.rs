use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DomainError, DomainResult, Lifecycle, TransitionPolicy, Violations};
use crate::models::comment::{Comment, CreateComment};
use crate::models::subtask::{CreateSubtask, Subtask, UpdateSubtask};
use crate::models::task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask};
use crate::store::Page;

/// Input for creating a task
///
/// Priority and status arrive as strings and are parsed here so unknown
/// values become field violations.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Partial task update
///
/// `due_date` and `assignee_id` take `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSubtask {
    pub title: String,
    pub is_complete: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskChanges {
    pub title: Option<String>,
    pub is_complete: Option<bool>,
}

impl Lifecycle {
    async fn check_assignee(&self, violations: &mut Violations, assignee_id: Uuid) -> DomainResult<()> {
        if self.store.find_user(assignee_id).await?.is_none() {
            violations.push("assignee_id", format!("user {} does not exist", assignee_id));
        }
        Ok(())
    }

    /// Creates a task in an existing project
    ///
    /// Status defaults to `Open` and priority to `Medium`. The assignee must
    /// exist but need not be a project member.
    pub async fn create_task(&self, actor: Uuid, data: NewTask) -> DomainResult<Task> {
        let mut violations = Violations::default();
        violations.require_text("title", &data.title);
        let priority = violations.parse::<TaskPriority>("priority", data.priority.as_deref());
        let status = violations.parse::<TaskStatus>("status", data.status.as_deref());

        match data.project_id {
            None => violations.push("project_id", "project_id is required"),
            Some(project_id) => {
                if self.store.find_project(project_id).await?.is_none() {
                    violations.push(
                        "project_id",
                        format!("project {} does not exist", project_id),
                    );
                }
            }
        }

        if let Some(assignee_id) = data.assignee_id {
            self.check_assignee(&mut violations, assignee_id).await?;
        }
        violations.finish()?;

        let Some(project_id) = data.project_id else {
            return Err(DomainError::invalid("project_id", "project_id is required"));
        };

        let task = self
            .store
            .create_task(CreateTask {
                id: data.id,
                title: data.title.trim().to_string(),
                description: data.description.unwrap_or_default(),
                due_date: data.due_date,
                priority: priority.unwrap_or_default(),
                status: status.unwrap_or_default(),
                project_id,
                assignee_id: data.assignee_id,
                created_by: Some(actor),
            })
            .await?;

        info!(task_id = %task.id, %project_id, status = %task.status, "Created task");
        Ok(task)
    }

    pub async fn get_task(&self, id: Uuid) -> DomainResult<Task> {
        self.store
            .find_task(id)
            .await?
            .ok_or_else(|| DomainError::not_found("task", id))
    }

    pub async fn list_tasks(&self, page: Page) -> DomainResult<Vec<Task>> {
        Ok(self.store.list_tasks(page).await?)
    }

    /// Applies a partial update
    ///
    /// A status change is checked against the configured
    /// [`TransitionPolicy`]. Under the strict policy, a task whose status
    /// moved in the meantime fails with a store conflict instead of skipping
    /// the check.
    pub async fn update_task(&self, id: Uuid, changes: TaskChanges) -> DomainResult<Task> {
        let current = self.get_task(id).await?;

        let mut violations = Violations::default();
        if let Some(title) = &changes.title {
            violations.require_text("title", title);
        }
        let priority = violations.parse::<TaskPriority>("priority", changes.priority.as_deref());
        let status = violations.parse::<TaskStatus>("status", changes.status.as_deref());

        if let Some(target) = status {
            if !self.transitions.allows(current.status, target) {
                violations.push(
                    "status",
                    format!("cannot move task from {} to {}", current.status, target),
                );
            }
        }

        if let Some(Some(assignee_id)) = changes.assignee_id {
            self.check_assignee(&mut violations, assignee_id).await?;
        }
        violations.finish()?;

        // A checked transition must still start from the status it was checked against
        let expected_status = match (self.transitions, status) {
            (TransitionPolicy::Strict, Some(target)) if target != current.status => {
                Some(current.status)
            }
            _ => None,
        };

        let update = UpdateTask {
            title: changes.title.map(|t| t.trim().to_string()),
            description: changes.description,
            due_date: changes.due_date,
            priority,
            status,
            assignee_id: changes.assignee_id,
            expected_status,
        };

        let task = self
            .store
            .update_task(id, update)
            .await?
            .ok_or_else(|| DomainError::not_found("task", id))?;

        if task.status != current.status {
            info!(task_id = %id, from = %current.status, to = %task.status, "Task status changed");
        } else {
            debug!(task_id = %id, "Updated task");
        }
        Ok(task)
    }

    /// Deletes a task; subtasks and comments follow the store's deletion policy
    pub async fn delete_task(&self, id: Uuid) -> DomainResult<()> {
        if !self.store.delete_task(id).await? {
            return Err(DomainError::not_found("task", id));
        }

        info!(task_id = %id, policy = %self.store.deletion_policy(), "Deleted task");
        Ok(())
    }

    // Subtasks

    pub async fn list_subtasks(&self, task_id: Uuid) -> DomainResult<Vec<Subtask>> {
        self.get_task(task_id).await?;
        Ok(self.store.list_subtasks(task_id).await?)
    }

    pub async fn create_subtask(&self, task_id: Uuid, data: NewSubtask) -> DomainResult<Subtask> {
        self.get_task(task_id).await?;

        let mut violations = Violations::default();
        violations.require_text("title", &data.title);
        violations.finish()?;

        let subtask = self
            .store
            .create_subtask(CreateSubtask {
                task_id,
                title: data.title.trim().to_string(),
                is_complete: data.is_complete.unwrap_or(false),
            })
            .await?;

        debug!(subtask_id = %subtask.id, %task_id, "Created subtask");
        Ok(subtask)
    }

    pub async fn get_subtask(&self, task_id: Uuid, id: Uuid) -> DomainResult<Subtask> {
        self.store
            .find_subtask(task_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("subtask", id))
    }

    pub async fn update_subtask(
        &self,
        task_id: Uuid,
        id: Uuid,
        changes: SubtaskChanges,
    ) -> DomainResult<Subtask> {
        self.get_task(task_id).await?;

        let mut violations = Violations::default();
        if let Some(title) = &changes.title {
            violations.require_text("title", title);
        }
        violations.finish()?;

        let update = UpdateSubtask {
            title: changes.title.map(|t| t.trim().to_string()),
            is_complete: changes.is_complete,
        };

        self.store
            .update_subtask(task_id, id, update)
            .await?
            .ok_or_else(|| DomainError::not_found("subtask", id))
    }

    pub async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> DomainResult<()> {
        if !self.store.delete_subtask(task_id, id).await? {
            return Err(DomainError::not_found("subtask", id));
        }
        Ok(())
    }

    // Comments

    pub async fn list_comments(&self, task_id: Uuid) -> DomainResult<Vec<Comment>> {
        self.get_task(task_id).await?;
        Ok(self.store.list_comments(task_id).await?)
    }

    /// Adds a comment authored by `actor`
    pub async fn add_comment(&self, task_id: Uuid, actor: Uuid, content: &str) -> DomainResult<Comment> {
        self.get_task(task_id).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::invalid("content", "content must not be empty"));
        }

        let comment = self
            .store
            .create_comment(CreateComment {
                task_id,
                user_id: actor,
                content: content.to_string(),
            })
            .await?;

        debug!(comment_id = %comment.id, %task_id, user_id = %actor, "Added comment");
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{NewProject, NewUser, TransitionPolicy};
    use crate::models::role::Role;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    async fn setup(policy: TransitionPolicy) -> (Lifecycle, Uuid, Uuid) {
        let lifecycle =
            Lifecycle::new(Arc::new(MemoryStore::new())).with_transition_policy(policy);

        let user = lifecycle
            .create_user(NewUser {
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                password: "password123".to_string(),
                role: Role::User,
                timezone: None,
                language: None,
            })
            .await
            .unwrap();

        let project = lifecycle
            .create_project(
                user.id,
                NewProject {
                    name: "Alpha Launch".to_string(),
                    start_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                    end_date: Some(Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        (lifecycle, user.id, project.id)
    }

    fn task_in(project_id: Uuid) -> NewTask {
        NewTask {
            title: "Fix login bug".to_string(),
            project_id: Some(project_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_task_defaults() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Unconstrained).await;
        let task = lifecycle.create_task(user_id, task_in(project_id)).await.unwrap();

        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_by, Some(user_id));
        assert_eq!(task.description, "");
    }

    #[tokio::test]
    async fn test_create_task_unknown_project() {
        let (lifecycle, user_id, _) = setup(TransitionPolicy::Unconstrained).await;
        let err = lifecycle
            .create_task(user_id, task_in(Uuid::new_v4()))
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(list) => assert_eq!(list[0].field, "project_id"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_task_bad_priority_and_assignee() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Unconstrained).await;
        let err = lifecycle
            .create_task(
                user_id,
                NewTask {
                    priority: Some("Urgent".to_string()),
                    assignee_id: Some(Uuid::new_v4()),
                    ..task_in(project_id)
                },
            )
            .await
            .unwrap_err();

        match err {
            DomainError::Validation(list) => {
                let fields: Vec<_> = list.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(fields, vec!["priority", "assignee_id"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unconstrained_reopen() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Unconstrained).await;
        let task = lifecycle.create_task(user_id, task_in(project_id)).await.unwrap();

        for status in ["Done", "Open"] {
            let updated = lifecycle
                .update_task(
                    task.id,
                    TaskChanges {
                        status: Some(status.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(updated.status.as_str(), status);
        }
    }

    #[tokio::test]
    async fn test_strict_rejects_reopen() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Strict).await;
        let task = lifecycle.create_task(user_id, task_in(project_id)).await.unwrap();

        let done = TaskChanges {
            status: Some("Done".to_string()),
            ..Default::default()
        };
        lifecycle.update_task(task.id, done).await.unwrap();

        let reopen = TaskChanges {
            status: Some("Open".to_string()),
            ..Default::default()
        };
        match lifecycle.update_task(task.id, reopen).await.unwrap_err() {
            DomainError::Validation(list) => assert_eq!(list[0].field, "status"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_assignee() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Unconstrained).await;
        let task = lifecycle
            .create_task(
                user_id,
                NewTask {
                    assignee_id: Some(user_id),
                    ..task_in(project_id)
                },
            )
            .await
            .unwrap();
        assert_eq!(task.assignee_id, Some(user_id));

        let updated = lifecycle
            .update_task(
                task.id,
                TaskChanges {
                    assignee_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.assignee_id, None);
    }

    #[tokio::test]
    async fn test_subtasks_and_comments_need_task() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Unconstrained).await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            lifecycle
                .create_subtask(missing, NewSubtask { title: "x".to_string(), is_complete: None })
                .await,
            Err(DomainError::NotFound { entity: "task", .. })
        ));
        assert!(matches!(
            lifecycle.add_comment(missing, user_id, "hi").await,
            Err(DomainError::NotFound { entity: "task", .. })
        ));

        let task = lifecycle.create_task(user_id, task_in(project_id)).await.unwrap();
        assert!(matches!(
            lifecycle.add_comment(task.id, user_id, "   ").await,
            Err(DomainError::Validation(_))
        ));

        let comment = lifecycle.add_comment(task.id, user_id, " looks good ").await.unwrap();
        assert_eq!(comment.content, "looks good");
        assert_eq!(comment.user_id, user_id);
    }

    #[tokio::test]
    async fn test_subtask_update_scoped_to_task() {
        let (lifecycle, user_id, project_id) = setup(TransitionPolicy::Unconstrained).await;
        let first = lifecycle.create_task(user_id, task_in(project_id)).await.unwrap();
        let second = lifecycle.create_task(user_id, task_in(project_id)).await.unwrap();

        let subtask = lifecycle
            .create_subtask(
                first.id,
                NewSubtask {
                    title: "Write test".to_string(),
                    is_complete: None,
                },
            )
            .await
            .unwrap();
        assert!(!subtask.is_complete);

        let complete = SubtaskChanges {
            is_complete: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            lifecycle.update_subtask(second.id, subtask.id, complete.clone()).await,
            Err(DomainError::NotFound { entity: "subtask", .. })
        ));

        let updated = lifecycle
            .update_subtask(first.id, subtask.id, complete)
            .await
            .unwrap();
        assert!(updated.is_complete);
    }
}
