/// Task model and database operations
///
/// Tasks belong to exactly one project and may be assigned to a user.
///
/// # Status
///
/// ```text
/// Open ⇄ InProgress
/// Open | InProgress → Done
/// Open | InProgress → Canceled
/// ```
///
/// The diagram is the strict transition table ([`TaskStatus::can_transition_to`]).
/// Whether it is enforced is a lifecycle setting; see
/// [`crate::lifecycle::TransitionPolicy`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('Open', 'InProgress', 'Done', 'Canceled');
/// CREATE TYPE task_priority AS ENUM ('High', 'Medium', 'Low');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     due_date TIMESTAMPTZ,
///     priority task_priority NOT NULL DEFAULT 'Medium',
///     status task_status NOT NULL DEFAULT 'Open',
///     project_id UUID NOT NULL REFERENCES projects(id),
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    /// Initial state
    #[default]
    Open,

    /// Work has started
    InProgress,

    /// Work is complete
    Done,

    /// Task was abandoned
    Canceled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Done => "Done",
            TaskStatus::Canceled => "Canceled",
        }
    }

    /// Checks if status is terminal under the strict table
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Canceled)
    }

    /// Checks if transition to target status is allowed by the strict table
    ///
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        if *self == target {
            return true;
        }

        match (self, target) {
            (TaskStatus::Open, TaskStatus::InProgress) => true,
            (TaskStatus::Open, TaskStatus::Done) => true,
            (TaskStatus::Open, TaskStatus::Canceled) => true,

            (TaskStatus::InProgress, TaskStatus::Open) => true,
            (TaskStatus::InProgress, TaskStatus::Done) => true,
            (TaskStatus::InProgress, TaskStatus::Canceled) => true,

            // Terminal states cannot transition
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Case-insensitive; `in_progress` is accepted for `InProgress`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "inprogress" | "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "canceled" => Ok(TaskStatus::Canceled),
            _ => Err(format!(
                "status must be one of Open, InProgress, Done, Canceled (got '{}')",
                s
            )),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::Low => "Low",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            _ => Err(format!(
                "priority must be one of High, Medium, Low (got '{}')",
                s
            )),
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,

    /// Project this task belongs to
    pub project_id: Uuid,

    /// Assigned user (nullable if unassigned or user deleted)
    pub assignee_id: Option<Uuid>,

    /// User who created the task (nullable if user deleted)
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Caller-chosen ID; generated when absent
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Input for updating an existing task
///
/// `due_date` and `assignee_id` use `Some(None)` to clear the column.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Option<Uuid>>,

    /// When set, the update only applies while the stored status still
    /// equals this value
    pub expected_status: Option<TaskStatus>,
}

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, project_id, \
                            assignee_id, created_by, created_at, updated_at";

impl Task {
    /// Builds a task record from creation input without touching the database
    pub fn from_create(data: CreateTask) -> Self {
        let now = Utc::now();
        Self {
            id: data.id.unwrap_or_else(Uuid::new_v4),
            title: data.title,
            description: data.description,
            due_date: data.due_date,
            priority: data.priority,
            status: data.status,
            project_id: data.project_id,
            assignee_id: data.assignee_id,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place (`expected_status` is the
    /// caller's to check)
    pub fn apply(&mut self, data: UpdateTask) {
        if let Some(title) = data.title {
            self.title = title;
        }
        if let Some(description) = data.description {
            self.description = description;
        }
        if let Some(due_date) = data.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = data.priority {
            self.priority = priority;
        }
        if let Some(status) = data.status {
            self.status = status;
        }
        if let Some(assignee_id) = data.assignee_id {
            self.assignee_id = assignee_id;
        }
        self.updated_at = Utc::now();
    }

    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist (foreign key violation)
    /// or the ID is already taken.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = Self::from_create(data);

        let query = format!(
            r#"
            INSERT INTO tasks (id, title, description, due_date, priority, status,
                               project_id, assignee_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(task.title)
            .bind(task.description)
            .bind(task.due_date)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.project_id)
            .bind(task.assignee_id)
            .bind(task.created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists tasks, oldest first
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Lists the tasks of one project, oldest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at, id"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Updates an existing task
    ///
    /// Only non-None fields in `data` will be updated. The status column is
    /// written as given; transition rules are checked by the caller.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("title", data.title.is_some()),
            ("description", data.description.is_some()),
            ("due_date", data.due_date.is_some()),
            ("priority", data.priority.is_some()),
            ("status", data.status.is_some()),
            ("assignee_id", data.assignee_id.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(" WHERE id = $1");
        if data.expected_status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        query.push_str(&format!(" RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(assignee_id) = data.assignee_id {
            q = q.bind(assignee_id);
        }
        if let Some(expected) = data.expected_status {
            q = q.bind(expected);
        }

        q.fetch_optional(pool).await
    }

    /// Case-insensitive substring search over title and description
    pub async fn search(pool: &PgPool, pattern: &str) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE title ILIKE $1 ESCAPE '\' OR description ILIKE $1 ESCAPE '\'
            ORDER BY created_at, id
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(pattern)
            .fetch_all(pool)
            .await
    }
}
