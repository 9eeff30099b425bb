//! In-memory store for tests and database-less runs.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{status_changed, DeletionPolicy, Page, Store, StoreError, StoreResult};
use crate::models::{
    comment::{Comment, CreateComment},
    notification::{CreateNotification, Notification},
    project::{CreateProject, Project, UpdateProject},
    role::{Role, RoleRecord},
    subtask::{CreateSubtask, Subtask, UpdateSubtask},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, UpdateUser, User},
};

/// Thread-safe in-memory store.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    deletion: DeletionPolicy,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    /// (project_id, user_id) with insertion sequence for stable member order
    memberships: HashMap<(Uuid, Uuid), u64>,
    membership_seq: u64,
    tasks: HashMap<Uuid, Task>,
    subtasks: HashMap<Uuid, Subtask>,
    comments: HashMap<Uuid, Comment>,
    notifications: HashMap<Uuid, Notification>,
}

impl MemoryStore {
    /// Creates an empty store with the default (cascade) deletion policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given deletion policy.
    #[must_use]
    pub fn with_deletion_policy(deletion: DeletionPolicy) -> Self {
        Self {
            state: Arc::default(),
            deletion,
        }
    }
}

/// Collects values ordered by `(created_at, id)`.
fn ordered<T, K, F>(values: impl Iterator<Item = T>, key: F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut items: Vec<T> = values.collect();
    items.sort_by_key(|item| key(item));
    items
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Matches the `lower(email)` unique index, including non-ASCII letters
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && same_email(&u.email, email))
    }

    fn task_ids_of_project(&self, project_id: Uuid) -> BTreeSet<Uuid> {
        self.tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id)
            .collect()
    }

    fn remove_task_children(&mut self, task_ids: &BTreeSet<Uuid>) {
        self.subtasks.retain(|_, s| !task_ids.contains(&s.task_id));
        self.comments.retain(|_, c| !task_ids.contains(&c.task_id));
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn deletion_policy(&self) -> DeletionPolicy {
        self.deletion
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&data.email, None) {
            return Err(StoreError::Conflict("email already exists".to_string()));
        }

        let user = User::from_create(data);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned())
    }

    async fn list_users(&self, page: Page) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let users = ordered(state.users.values().cloned(), |u| (u.created_at, u.id));
        Ok(page.slice(users))
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = data.email.as_deref() {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict("email already exists".to_string()));
            }
        }

        Ok(state.users.get_mut(&id).map(|user| {
            user.apply(data);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        state.memberships.retain(|(_, user_id), _| *user_id != id);
        state.comments.retain(|_, c| c.user_id != id);
        state.notifications.retain(|_, n| n.user_id != id);
        for task in state.tasks.values_mut() {
            if task.assignee_id == Some(id) {
                task.assignee_id = None;
            }
            if task.created_by == Some(id) {
                task.created_by = None;
            }
        }
        for project in state.projects.values_mut() {
            if project.created_by == Some(id) {
                project.created_by = None;
            }
        }

        Ok(true)
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        Ok(Role::ALL.into_iter().map(RoleRecord::from).collect())
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        let mut state = self.state.write().await;
        let project = Project::from_create(data);
        if state.projects.contains_key(&project.id) {
            return Err(StoreError::Conflict(format!(
                "project {} already exists",
                project.id
            )));
        }

        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self, page: Page) -> StoreResult<Vec<Project>> {
        let state = self.state.read().await;
        let projects = ordered(state.projects.values().cloned(), |p| (p.created_at, p.id));
        Ok(page.slice(projects))
    }

    async fn update_project(
        &self,
        id: Uuid,
        data: UpdateProject,
    ) -> StoreResult<Option<Project>> {
        let mut state = self.state.write().await;
        Ok(state.projects.get_mut(&id).map(|project| {
            project.apply(data);
            project.clone()
        }))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.projects.contains_key(&id) {
            return Ok(false);
        }

        let task_ids = state.task_ids_of_project(id);
        match self.deletion {
            DeletionPolicy::Restrict if !task_ids.is_empty() => {
                return Err(StoreError::Conflict(format!(
                    "project {} still has {} task(s)",
                    id,
                    task_ids.len()
                )));
            }
            DeletionPolicy::Restrict => {}
            DeletionPolicy::Cascade => {
                state.remove_task_children(&task_ids);
                state.tasks.retain(|task_id, _| !task_ids.contains(task_id));
            }
        }

        state.memberships.retain(|(project_id, _), _| *project_id != id);
        state.projects.remove(&id);
        Ok(true)
    }

    async fn search_projects(&self, needle: &str) -> StoreResult<Vec<Project>> {
        let needle = needle.to_lowercase();
        let state = self.state.read().await;
        let hits = state
            .projects
            .values()
            .filter(|p| contains_ci(&p.name, &needle) || contains_ci(&p.description, &needle))
            .cloned();
        Ok(ordered(hits, |p| (p.created_at, p.id)))
    }

    async fn list_project_members(&self, project_id: Uuid) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut members: Vec<(u64, User)> = state
            .memberships
            .iter()
            .filter(|((pid, _), _)| *pid == project_id)
            .filter_map(|((_, uid), seq)| state.users.get(uid).map(|u| (*seq, u.clone())))
            .collect();
        members.sort_by_key(|(seq, _)| *seq);
        Ok(members.into_iter().map(|(_, user)| user).collect())
    }

    async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.projects.contains_key(&project_id) || !state.users.contains_key(&user_id) {
            return Err(StoreError::Conflict(
                "membership references a missing project or user".to_string(),
            ));
        }

        if !state.memberships.contains_key(&(project_id, user_id)) {
            state.membership_seq += 1;
            let seq = state.membership_seq;
            state.memberships.insert((project_id, user_id), seq);
        }
        Ok(())
    }

    async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.memberships.remove(&(project_id, user_id)).is_some())
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        if !state.projects.contains_key(&data.project_id) {
            return Err(StoreError::Conflict(format!(
                "project {} does not exist",
                data.project_id
            )));
        }

        let task = Task::from_create(data);
        if state.tasks.contains_key(&task.id) {
            return Err(StoreError::Conflict(format!("task {} already exists", task.id)));
        }

        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, page: Page) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let tasks = ordered(state.tasks.values().cloned(), |t| (t.created_at, t.id));
        Ok(page.slice(tasks))
    }

    async fn list_project_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let tasks = state
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned();
        Ok(ordered(tasks, |t| (t.created_at, t.id)))
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(expected) = data.expected_status {
            if task.status != expected {
                return Err(status_changed(id));
            }
        }

        task.apply(data);
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&id) {
            return Ok(false);
        }

        let ids = BTreeSet::from([id]);
        match self.deletion {
            DeletionPolicy::Restrict => {
                let subtasks = state.subtasks.values().filter(|s| s.task_id == id).count();
                let comments = state.comments.values().filter(|c| c.task_id == id).count();
                if subtasks + comments > 0 {
                    return Err(StoreError::Conflict(format!(
                        "task {} still has {} subtask(s) and {} comment(s)",
                        id, subtasks, comments
                    )));
                }
            }
            DeletionPolicy::Cascade => state.remove_task_children(&ids),
        }

        state.tasks.remove(&id);
        Ok(true)
    }

    async fn search_tasks(&self, needle: &str) -> StoreResult<Vec<Task>> {
        let needle = needle.to_lowercase();
        let state = self.state.read().await;
        let hits = state
            .tasks
            .values()
            .filter(|t| contains_ci(&t.title, &needle) || contains_ci(&t.description, &needle))
            .cloned();
        Ok(ordered(hits, |t| (t.created_at, t.id)))
    }

    async fn create_subtask(&self, data: CreateSubtask) -> StoreResult<Subtask> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&data.task_id) {
            return Err(StoreError::Conflict(format!("task {} does not exist", data.task_id)));
        }

        let subtask = Subtask::from_create(data);
        state.subtasks.insert(subtask.id, subtask.clone());
        Ok(subtask)
    }

    async fn find_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<Option<Subtask>> {
        let state = self.state.read().await;
        Ok(state
            .subtasks
            .get(&id)
            .filter(|s| s.task_id == task_id)
            .cloned())
    }

    async fn list_subtasks(&self, task_id: Uuid) -> StoreResult<Vec<Subtask>> {
        let state = self.state.read().await;
        let subtasks = state
            .subtasks
            .values()
            .filter(|s| s.task_id == task_id)
            .cloned();
        Ok(ordered(subtasks, |s| (s.created_at, s.id)))
    }

    async fn update_subtask(
        &self,
        task_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> StoreResult<Option<Subtask>> {
        let mut state = self.state.write().await;
        Ok(state
            .subtasks
            .get_mut(&id)
            .filter(|s| s.task_id == task_id)
            .map(|subtask| {
                subtask.apply(data);
                subtask.clone()
            }))
    }

    async fn delete_subtask(&self, task_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let belongs = state
            .subtasks
            .get(&id)
            .is_some_and(|s| s.task_id == task_id);
        if belongs {
            state.subtasks.remove(&id);
        }
        Ok(belongs)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&data.task_id) {
            return Err(StoreError::Conflict(format!("task {} does not exist", data.task_id)));
        }
        if !state.users.contains_key(&data.user_id) {
            return Err(StoreError::Conflict(format!("user {} does not exist", data.user_id)));
        }

        let comment = Comment::from_create(data);
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let comments = state
            .comments
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned();
        Ok(ordered(comments, |c| (c.created_at, c.id)))
    }

    async fn create_notification(&self, data: CreateNotification) -> StoreResult<Notification> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&data.user_id) {
            return Err(StoreError::Conflict(format!("user {} does not exist", data.user_id)));
        }

        let notification = Notification::from_create(data);
        state.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        let mut state = self.state.write().await;
        Ok(state
            .notifications
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
            .map(|notification| {
                notification.is_read = true;
                notification.updated_at = chrono::Utc::now();
                notification.clone()
            }))
    }
}
