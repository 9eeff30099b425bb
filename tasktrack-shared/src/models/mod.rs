/// Database models for TaskTrack
///
/// This module contains the domain entities and their PostgreSQL row operations.
///
/// # Models
///
/// - `role`: Closed set of access roles (admin, user)
/// - `user`: User accounts
/// - `project`: Projects and project membership
/// - `task`: Tasks with status and priority
/// - `subtask`: Checklist items attached to a task
/// - `comment`: Discussion entries on a task
/// - `notification`: Per-user notifications
/// - `datetime`: Lenient date parsing for request payloads
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::models::project::{CreateProject, Project};
/// use tasktrack_shared::db::pool::{create_pool, DatabaseConfig};
/// use chrono::{Duration, Utc};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     id: None,
///     name: "Alpha Launch".to_string(),
///     description: "First public release".to_string(),
///     start_date: Utc::now(),
///     end_date: Utc::now() + Duration::days(30),
///     created_by: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod datetime;
pub mod notification;
pub mod project;
pub mod role;
pub mod subtask;
pub mod task;
pub mod user;
