use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DomainError, DomainResult, Lifecycle, Violations};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::task::Task;
use crate::models::user::User;
use crate::store::Page;

const DATE_ORDER_MESSAGE: &str = "end_date must not precede start_date";

/// Input for creating a project
///
/// Dates are optional here only so that a missing one is reported as a
/// field violation.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Partial project update
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// Creates a project owned by `actor`
    ///
    /// # Errors
    ///
    /// `Validation` when the name is empty, a date is missing, or `end_date`
    /// precedes `start_date`.
    pub async fn create_project(&self, actor: Uuid, data: NewProject) -> DomainResult<Project> {
        let mut violations = Violations::default();
        violations.require_text("name", &data.name);
        if data.start_date.is_none() {
            violations.push("start_date", "start_date is required");
        }
        if data.end_date.is_none() {
            violations.push("end_date", "end_date is required");
        }

        if let (Some(start), Some(end)) = (data.start_date, data.end_date) {
            if end < start {
                violations.push("end_date", DATE_ORDER_MESSAGE);
            }
        }
        violations.finish()?;

        let (Some(start_date), Some(end_date)) = (data.start_date, data.end_date) else {
            return Err(DomainError::invalid("start_date", "start_date is required"));
        };

        let project = self
            .store
            .create_project(CreateProject {
                id: data.id,
                name: data.name.trim().to_string(),
                description: data.description.unwrap_or_default(),
                start_date,
                end_date,
                created_by: Some(actor),
            })
            .await?;

        info!(project_id = %project.id, user_id = %actor, "Created project");
        Ok(project)
    }

    pub async fn get_project(&self, id: Uuid) -> DomainResult<Project> {
        self.store
            .find_project(id)
            .await?
            .ok_or_else(|| DomainError::not_found("project", id))
    }

    pub async fn list_projects(&self, page: Page) -> DomainResult<Vec<Project>> {
        Ok(self.store.list_projects(page).await?)
    }

    /// Applies a partial update, checking date order against the merged
    /// values
    pub async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> DomainResult<Project> {
        let current = self.get_project(id).await?;

        let mut violations = Violations::default();
        if let Some(name) = &changes.name {
            violations.require_text("name", name);
        }
        let start = changes.start_date.unwrap_or(current.start_date);
        let end = changes.end_date.unwrap_or(current.end_date);
        if end < start {
            violations.push("end_date", DATE_ORDER_MESSAGE);
        }
        violations.finish()?;

        let update = UpdateProject {
            name: changes.name.map(|n| n.trim().to_string()),
            description: changes.description,
            start_date: changes.start_date,
            end_date: changes.end_date,
        };

        let project = self
            .store
            .update_project(id, update)
            .await?
            .ok_or_else(|| DomainError::not_found("project", id))?;

        debug!(project_id = %id, "Updated project");
        Ok(project)
    }

    /// Deletes a project; its tasks follow the store's deletion policy
    pub async fn delete_project(&self, id: Uuid) -> DomainResult<()> {
        if !self.store.delete_project(id).await? {
            return Err(DomainError::not_found("project", id));
        }

        info!(project_id = %id, policy = %self.store.deletion_policy(), "Deleted project");
        Ok(())
    }

    pub async fn project_tasks(&self, id: Uuid) -> DomainResult<Vec<Task>> {
        self.get_project(id).await?;
        Ok(self.store.list_project_tasks(id).await?)
    }

    pub async fn project_members(&self, id: Uuid) -> DomainResult<Vec<User>> {
        self.get_project(id).await?;
        Ok(self.store.list_project_members(id).await?)
    }

    /// Adds a member; adding an existing member is a no-op
    pub async fn add_project_member(&self, project_id: Uuid, user_id: Uuid) -> DomainResult<()> {
        self.get_project(project_id).await?;
        self.get_user(user_id).await?;

        self.store.add_project_member(project_id, user_id).await?;
        debug!(%project_id, %user_id, "Added project member");
        Ok(())
    }

    pub async fn remove_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> DomainResult<()> {
        if !self.store.remove_project_member(project_id, user_id).await? {
            return Err(DomainError::not_found("membership", user_id));
        }

        debug!(%project_id, %user_id, "Removed project member");
        Ok(())
    }
}
